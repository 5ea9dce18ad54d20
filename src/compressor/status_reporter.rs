//! # Status Reporter Module
//!
//! Unico task che scrive sulla console durante il run.
//!
//! Ad ogni tick (50ms) stampa al massimo un errore e un warning, ridisegna la
//! riga di progresso se il contatore è cambiato e termina la prima volta che
//! vede `processati == totale`. È l'unico punto in cui il run viene
//! dichiarato concluso, anche in caso di cancellazione.

use crate::compressor::progress_tracker::ProgressTracker;
use crate::progress::{CompressionStats, ProgressManager};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Come è terminato un run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Cancelled,
}

/// Valore restituito alla fine di un run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub total_files: usize,
    pub files_processed: usize,
    /// Errori nell'ordine in cui sono stati mostrati
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub stats: CompressionStats,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }
}

pub struct StatusReporter {
    tracker: Arc<ProgressTracker>,
    progress: ProgressManager,
    cancel: CancellationToken,
    tick: Duration,
}

impl StatusReporter {
    pub fn new(tracker: Arc<ProgressTracker>, progress: ProgressManager, cancel: CancellationToken) -> Self {
        Self {
            tracker,
            progress,
            cancel,
            tick: TICK_INTERVAL,
        }
    }

    pub async fn run(self) -> RunReport {
        let started = Instant::now();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut last_count: Option<usize> = None;

        let outcome = loop {
            if let Some(error) = self.tracker.next_error() {
                self.progress.print_error(&error);
                errors.push(error);
            }
            if let Some(warning) = self.tracker.next_warning() {
                self.progress.print_warning(&warning);
                warnings.push(warning);
            }

            let processed = self.tracker.processed();
            if last_count != Some(processed) {
                last_count = Some(processed);
                self.progress.set_position(processed as u64);
                if processed == self.tracker.total_files {
                    break RunOutcome::Completed;
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.tick) => {}
                _ = self.cancel.cancelled() => break RunOutcome::Cancelled,
            }
        };

        // workers push diagnostics before counting the item, nothing may be left behind
        while let Some(error) = self.tracker.next_error() {
            self.progress.print_error(&error);
            errors.push(error);
        }
        while let Some(warning) = self.tracker.next_warning() {
            self.progress.print_warning(&warning);
            warnings.push(warning);
        }

        let stats = self.tracker.stats().await;
        match outcome {
            RunOutcome::Completed => self.progress.finish("done"),
            RunOutcome::Cancelled => self.progress.abandon("cancelled"),
        }
        debug!("Status reporter finished: {:?}", outcome);

        RunReport {
            outcome,
            total_files: self.tracker.total_files,
            files_processed: self.tracker.processed(),
            errors,
            warnings,
            stats,
            elapsed: started.elapsed(),
        }
    }
}
