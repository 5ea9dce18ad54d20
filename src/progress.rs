//! # Progress Rendering and Statistics Module
//!
//! Questo modulo gestisce la visualizzazione del progresso e le statistiche del run.
//!
//! ## Responsabilità:
//! - Progress bar su una sola riga con `indicatif` (percentuale + conteggi)
//! - Stampa delle righe diagnostiche sopra la barra senza romperla
//! - Marcatori colorati per errori e warning (`console`)
//! - Riepilogo finale con byte risparmiati
//!
//! ## Visual feedback:
//! ```text
//! ✗ Failed to convert video '/in/clip.mov': Video conversion failed. (Code: 1) ...
//! [00:02:15] [=========================>--------------]  62% (150/240)
//! ```

use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

use crate::file_manager::FileManager;

/// Owns the single progress line of a run
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Progress bar drawn on stderr
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        if let Ok(bar_style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% ({pos}/{len}) {msg}")
        {
            bar.set_style(bar_style.progress_chars("=>-"));
        }

        Self { bar }
    }

    /// Progress bar that never draws, for tests and non-interactive runs
    pub fn hidden(total_files: u64) -> Self {
        let manager = Self::new(total_files);
        manager.bar.set_draw_target(ProgressDrawTarget::hidden());
        manager
    }

    /// Redraw the line with a new processed count
    pub fn set_position(&self, processed: u64) {
        self.bar.set_position(processed);
    }

    #[cfg(test)]
    pub(crate) fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Print an error line above the progress line
    pub fn print_error(&self, message: &str) {
        self.print_line(format!("{} {}", style("✗").red().bold(), style(message).red()));
    }

    /// Print a warning line above the progress line
    pub fn print_warning(&self, message: &str) {
        self.print_line(format!("{} {}", style("!").yellow().bold(), message));
    }

    // hidden or finished bars swallow println, diagnostics still have to reach the user
    fn print_line(&self, line: String) {
        if self.bar.is_hidden() || self.bar.is_finished() {
            eprintln!("{}", line);
        } else {
            self.bar.println(line);
        }
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Leave the bar where it stopped
    pub fn abandon(&self, message: &str) {
        self.bar.abandon_with_message(message.to_string());
    }

    /// Spinner used while listing the input directory
    pub fn spinner(message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();

        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(spinner_style);
        }

        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));

        spinner
    }
}

/// Aggregated outcome of a run, by disposition
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CompressionStats {
    /// Encoded outputs kept as final result
    pub files_converted: usize,
    /// Sources copied because the conversion failed or grew the file
    pub files_fallback: usize,
    /// Videos copied because their codec is ignored
    pub files_ignored: usize,
    /// Files routed straight to the plain copy queue
    pub files_copied: usize,
    pub errors: usize,
    pub warnings: usize,
    pub total_input_bytes: u64,
    pub total_output_bytes: u64,
}

impl CompressionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes_saved(&self) -> u64 {
        self.total_input_bytes.saturating_sub(self.total_output_bytes)
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        FileManager::calculate_reduction(self.total_input_bytes, self.total_output_bytes)
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Converted: {} | Fallback: {} | Ignored: {} | Copied: {} | Errors: {} | Warnings: {} | {} -> {} ({:.2}% saved)",
            self.files_converted,
            self.files_fallback,
            self.files_ignored,
            self.files_copied,
            self.errors,
            self.warnings,
            FileManager::format_size(self.total_input_bytes),
            FileManager::format_size(self.total_output_bytes),
            self.overall_reduction_percent()
        )
    }
}
