//! # Progress Tracking Module
//!
//! Stato condiviso di un run: contatori, code diagnostiche e statistiche.
//! I worker scrivono qui, lo status reporter legge. Nessun output su console
//! parte da questo modulo.

use crate::progress::CompressionStats;
use async_channel as chan;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// Esito finale di un file, per le statistiche
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Output codificato tenuto
    Converted,
    /// Sorgente copiato dopo una conversione fallita o troppo grande
    Fallback,
    /// Sorgente copiato perché il codec è ignorato
    Ignored,
    /// Coda di copia semplice
    Copied,
}

/// Contatori e diagnostica condivisi dai task di un run
pub struct ProgressTracker {
    pub total_files: usize,
    files_processed: AtomicUsize,
    errors_tx: chan::Sender<String>,
    errors_rx: chan::Receiver<String>,
    warnings_tx: chan::Sender<String>,
    warnings_rx: chan::Receiver<String>,
    stats: Mutex<CompressionStats>,
}

impl ProgressTracker {
    pub fn new(total_files: usize) -> Self {
        let (errors_tx, errors_rx) = chan::unbounded();
        let (warnings_tx, warnings_rx) = chan::unbounded();

        Self {
            total_files,
            files_processed: AtomicUsize::new(0),
            errors_tx,
            errors_rx,
            warnings_tx,
            warnings_rx,
            stats: Mutex::new(CompressionStats::new()),
        }
    }

    /// Conta un file come processato. Va chiamato una sola volta per file,
    /// dopo averne registrato statistiche e diagnostica.
    pub fn mark_processed(&self) -> usize {
        self.files_processed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn processed(&self) -> usize {
        self.files_processed.load(Ordering::SeqCst)
    }

    pub fn is_complete(&self) -> bool {
        self.processed() == self.total_files
    }

    /// Accoda un errore per il reporter
    pub async fn report_error(&self, message: String) {
        self.stats.lock().await.errors += 1;
        // both ends live in self, the channel can't be closed
        let _ = self.errors_tx.try_send(message);
    }

    /// Accoda un warning per il reporter
    pub async fn report_warning(&self, message: String) {
        self.stats.lock().await.warnings += 1;
        let _ = self.warnings_tx.try_send(message);
    }

    /// Registra l'esito di un file e i byte prima e dopo
    pub async fn record(&self, disposition: Disposition, input_bytes: u64, output_bytes: u64) {
        let mut stats = self.stats.lock().await;
        match disposition {
            Disposition::Converted => stats.files_converted += 1,
            Disposition::Fallback => stats.files_fallback += 1,
            Disposition::Ignored => stats.files_ignored += 1,
            Disposition::Copied => stats.files_copied += 1,
        }
        stats.total_input_bytes += input_bytes;
        stats.total_output_bytes += output_bytes;
    }

    pub fn next_error(&self) -> Option<String> {
        self.errors_rx.try_recv().ok()
    }

    pub fn next_warning(&self) -> Option<String> {
        self.warnings_rx.try_recv().ok()
    }

    pub async fn stats(&self) -> CompressionStats {
        self.stats.lock().await.clone()
    }
}
