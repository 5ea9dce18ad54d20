//! # Task Worker Module
//!
//! Worker per l'elaborazione dei singoli file di una coda.
//!
//! - `ConversionWorker`: prende un preset dall'allocatore, lancia l'encoder,
//!   valida l'output e ripiega sulla copia del sorgente quando serve
//! - `CopyWorker`: copia verbatim dei file non convertibili
//!
//! Ogni file raggiunge sempre uno stato terminale e viene contato una sola
//! volta, qualunque cosa succeda durante la conversione (panic inclusi).

use crate::compressor::parameters::{ParameterAllocator, ParameterSlot};
use crate::compressor::path_resolver::{OutputTargets, PathResolver};
use crate::compressor::progress_tracker::{Disposition, ProgressTracker};
use crate::config::{Config, MediaKind};
use crate::encoder::Encoder;
use crate::error::CompressError;
use crate::file_manager::FileManager;
use async_channel::Receiver;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Dimensione minima di un output dell'encoder considerato plausibile
pub const MIN_OUTPUT_BYTES: u64 = 1000;

/// Stato condiviso da tutti i worker di un run
#[derive(Clone)]
pub struct WorkerShared {
    pub encoder: Arc<Encoder>,
    pub resolver: Arc<PathResolver>,
    pub tracker: Arc<ProgressTracker>,
    pub cancel: CancellationToken,
    /// Scarta i risultati più grandi del sorgente
    pub reject_larger: bool,
    /// Codec video (minuscoli) copiati invece che codificati
    pub ignored_codecs: Arc<Vec<String>>,
    #[cfg(test)]
    pub(crate) panic_on: Option<PathBuf>,
}

impl WorkerShared {
    pub fn new(
        config: &Config,
        resolver: Arc<PathResolver>,
        tracker: Arc<ProgressTracker>,
        cancel: CancellationToken,
    ) -> Self {
        let ignored_codecs = config
            .ignored_video_codecs
            .iter()
            .map(|codec| codec.trim().to_lowercase())
            .filter(|codec| !codec.is_empty())
            .collect();

        Self {
            encoder: Arc::new(Encoder::from_config(config)),
            resolver,
            tracker,
            cancel,
            reject_larger: config.delete_result_if_bigger,
            ignored_codecs: Arc::new(ignored_codecs),
            #[cfg(test)]
            panic_on: None,
        }
    }

    fn is_ignored_codec(&self, codec: &str) -> bool {
        self.ignored_codecs.iter().any(|ignored| ignored == codec)
    }
}

/// Prossimo file da elaborare; `None` a coda chiusa e vuota o a run cancellato
async fn next_item(queue: &Receiver<PathBuf>, cancel: &CancellationToken) -> Option<PathBuf> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        item = queue.recv() => item.ok(),
    }
}

/// Esito di una conversione andata a buon fine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Converted {
    /// Output codificato tenuto nella destinazione
    Committed { output_bytes: u64 },
    /// Codec nella lista da ignorare, sorgente copiato
    Ignored,
    /// Output più grande del sorgente, sorgente copiato
    Oversized,
}

/// Worker di un pool per tipo di media
pub struct ConversionWorker {
    id: usize,
    kind: MediaKind,
    use_suffix: bool,
    queue: Receiver<PathBuf>,
    allocator: Arc<ParameterAllocator>,
    shared: WorkerShared,
}

impl ConversionWorker {
    pub fn new(
        id: usize,
        kind: MediaKind,
        use_suffix: bool,
        queue: Receiver<PathBuf>,
        allocator: Arc<ParameterAllocator>,
        shared: WorkerShared,
    ) -> Self {
        Self {
            id,
            kind,
            use_suffix,
            queue,
            allocator,
            shared,
        }
    }

    pub async fn run(self) {
        debug!("{} worker {} started", self.kind, self.id);
        while let Some(source) = next_item(&self.queue, &self.shared.cancel).await {
            self.process_item(&source).await;
        }
        debug!("{} worker {} stopped", self.kind, self.id);
    }

    async fn process_item(&self, source: &Path) {
        let slot = self.allocator.acquire().await;
        let source_size = FileManager::file_size(source).await;

        match self
            .shared
            .resolver
            .conversion_targets(source, &slot.preset.extension, self.use_suffix)
        {
            Ok(targets) => {
                let result = AssertUnwindSafe(self.convert(source, &targets, &slot, source_size))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(CompressError::Panicked(panic_message(panic))));

                let cancelled = matches!(result, Err(CompressError::Cancelled));
                let source_size = source_size.unwrap_or(0);
                self.settle(source, &targets, result, source_size).await;
                if !cancelled {
                    self.ensure_landed(source, &targets, source_size).await;
                }
            }
            Err(e) => {
                self.shared
                    .tracker
                    .report_error(format!("Failed to convert {} '{}': {}", self.kind.label(), source.display(), e))
                    .await;
            }
        }

        self.allocator.release(slot.index).await;
        self.shared.tracker.mark_processed();
    }

    async fn convert(
        &self,
        source: &Path,
        targets: &OutputTargets,
        slot: &ParameterSlot,
        source_size: Option<u64>,
    ) -> Result<Converted, CompressError> {
        #[cfg(test)]
        if self.shared.panic_on.as_deref() == Some(source) {
            panic!("conversion blew up on {}", source.display());
        }

        let destination = &targets.destination;
        PathResolver::ensure_parent_dirs(destination).await?;

        if self.kind == MediaKind::Video && !self.shared.ignored_codecs.is_empty() {
            match self.shared.encoder.probe_video_codec(source).await {
                Ok(Some(codec)) if self.shared.is_ignored_codec(&codec) => {
                    debug!("Skipping {} ({} codec is ignored)", source.display(), codec);
                    FileManager::copy_verbatim(source, destination).await?;
                    return Ok(Converted::Ignored);
                }
                Ok(_) => {}
                Err(e) => debug!("Codec probe failed for {}: {}", source.display(), e),
            }
        }

        let run = match self
            .shared
            .encoder
            .encode(source, &slot.preset.parameters, destination, &self.shared.cancel)
            .await
        {
            Ok(run) => run,
            Err(CompressError::Cancelled) => {
                if let Err(e) = FileManager::remove_if_exists(destination).await {
                    debug!("Failed to remove partial output {}: {}", destination.display(), e);
                }
                return Err(CompressError::Cancelled);
            }
            Err(e) => return Err(e),
        };

        let output_bytes = FileManager::file_size(destination).await.unwrap_or(0);
        if !run.succeeded() || output_bytes < MIN_OUTPUT_BYTES {
            self.replace_with_source(source, destination).await;
            return Err(CompressError::Conversion {
                kind: self.kind,
                code: run.exit_code,
                output: run.output,
            });
        }

        if let Some(source_size) = source_size {
            if self.shared.reject_larger && output_bytes > source_size {
                self.replace_with_source(source, destination).await;
                return Ok(Converted::Oversized);
            }
        }

        debug!(
            "{} -> {} ({} -> {})",
            source.display(),
            destination.display(),
            FileManager::format_size(source_size.unwrap_or(0)),
            FileManager::format_size(output_bytes)
        );
        Ok(Converted::Committed { output_bytes })
    }

    /// Elimina quanto lasciato dall'encoder e mette il sorgente al suo posto
    async fn replace_with_source(&self, source: &Path, destination: &Path) {
        if let Err(e) = FileManager::remove_if_exists(destination).await {
            debug!("Failed to remove {}: {}", destination.display(), e);
        }
        self.copy_or_report(source, destination).await;
    }

    /// Copia verbatim; un fallimento finisce nella coda errori
    async fn copy_or_report(&self, source: &Path, destination: &Path) -> bool {
        match FileManager::copy_verbatim(source, destination).await {
            Ok(_) => true,
            Err(e) => {
                self.shared
                    .tracker
                    .report_error(format!("Failed to copy file '{}': {}", source.display(), e))
                    .await;
                false
            }
        }
    }

    /// Registra la copia del sorgente solo se è davvero finita su disco
    async fn record_fallback(&self, destination: &Path, source_size: u64) {
        if destination.is_file() {
            self.shared
                .tracker
                .record(Disposition::Fallback, source_size, source_size)
                .await;
        }
    }

    /// Registra statistiche e diagnostica di una conversione terminata
    async fn settle(
        &self,
        source: &Path,
        targets: &OutputTargets,
        result: Result<Converted, CompressError>,
        source_size: u64,
    ) {
        let tracker = &self.shared.tracker;
        match result {
            Ok(Converted::Committed { output_bytes }) => {
                tracker.record(Disposition::Converted, source_size, output_bytes).await;
            }
            Ok(Converted::Ignored) => {
                tracker.record(Disposition::Ignored, source_size, source_size).await;
            }
            Ok(Converted::Oversized) => {
                self.record_fallback(&targets.destination, source_size).await;
                tracker
                    .report_warning(format!(
                        "Converted {} was larger than original, overwriting it. ('{}')",
                        self.kind.label(),
                        source.display()
                    ))
                    .await;
            }
            Err(CompressError::Cancelled) => {
                tracker
                    .report_error(format!(
                        "Failed to convert {} '{}': {}",
                        self.kind.label(),
                        source.display(),
                        CompressError::Cancelled
                    ))
                    .await;
            }
            Err(e @ CompressError::Conversion { .. }) => {
                self.record_fallback(&targets.destination, source_size).await;
                tracker
                    .report_error(format!("Failed to convert {} '{}': {}", self.kind.label(), source.display(), e))
                    .await;
            }
            Err(e) => {
                // the conversion never validated, try to leave the source in place of it
                if self.copy_or_report(source, &targets.destination).await {
                    self.record_fallback(&targets.destination, source_size).await;
                }
                tracker
                    .report_error(format!("Failed to convert {} '{}': {}", self.kind.label(), source.display(), e))
                    .await;
            }
        }
    }

    /// Ultima spiaggia: nessun file è arrivato su disco, copia con il nome senza suffisso
    async fn ensure_landed(&self, source: &Path, targets: &OutputTargets, source_size: u64) {
        if targets.destination.is_file() || targets.fallback.is_file() {
            return;
        }

        debug!("No output for {}, copying to {}", source.display(), targets.fallback.display());
        if self.copy_or_report(source, &targets.fallback).await {
            self.record_fallback(&targets.fallback, source_size).await;
        }
    }
}

/// Worker della coda di copia semplice
pub struct CopyWorker {
    queue: Receiver<PathBuf>,
    shared: WorkerShared,
}

impl CopyWorker {
    pub fn new(queue: Receiver<PathBuf>, shared: WorkerShared) -> Self {
        Self { queue, shared }
    }

    pub async fn run(self) {
        debug!("Copy worker started");
        while let Some(source) = next_item(&self.queue, &self.shared.cancel).await {
            if let Err(e) = self.copy(&source).await {
                self.shared
                    .tracker
                    .report_error(format!("Failed to copy file '{}': {}", source.display(), e))
                    .await;
            }
            self.shared.tracker.mark_processed();
        }
        debug!("Copy worker stopped");
    }

    async fn copy(&self, source: &Path) -> Result<(), CompressError> {
        let destination = self.shared.resolver.copy_destination(source)?;
        let bytes = FileManager::copy_verbatim(source, &destination).await?;
        self.shared.tracker.record(Disposition::Copied, bytes, bytes).await;
        debug!("Copied {} -> {}", source.display(), destination.display());
        Ok(())
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
