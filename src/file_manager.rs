//! # File Management Module
//!
//! Questo modulo gestisce tutte le operazioni sui file usate dall'engine.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva dei file nella directory di input (con dimensione)
//! - Normalizzazione delle estensioni (case-insensitive, senza punto iniziale)
//! - Copia verbatim con creazione delle directory di destinazione
//! - Utilità per dimensioni e percentuali human-readable
//!
//! ## Esempio:
//! ```ignore
//! let files = FileManager::discover_files("/path/to/media")?;
//! for file in files {
//!     println!("{} ({})", file.path.display(), FileManager::format_size(file.size));
//! }
//! ```

use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;
use walkdir::WalkDir;

/// A file found under the input directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub size: u64,
}

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Find every regular file below `root`, recursively
    pub fn discover_files(root: &Path) -> Result<Vec<DiscoveredFile>> {
        if !root.is_dir() {
            return Err(anyhow::anyhow!("Input directory does not exist: {}", root.display()));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            // unreadable metadata: size 0 sends the file to the plain copy queue
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            files.push(DiscoveredFile {
                path: entry.into_path(),
                size,
            });
        }

        Ok(files)
    }

    /// Lowercase, trimmed, without leading dot
    pub fn normalize_extension(extension: &str) -> String {
        let trimmed = extension.trim();
        trimmed.strip_prefix('.').unwrap_or(trimmed).trim().to_lowercase()
    }

    /// Normalized extension of a path, empty when it has none
    pub fn extension_of(path: &Path) -> String {
        path.extension()
            .map(|ext| Self::normalize_extension(&ext.to_string_lossy()))
            .unwrap_or_default()
    }

    /// Size of a file, `None` when it does not exist or can't be read
    pub async fn file_size(path: &Path) -> Option<u64> {
        fs::metadata(path).await.ok().map(|m| m.len())
    }

    /// Copy `source` over `destination`, creating parent directories
    pub async fn copy_verbatim(source: &Path, destination: &Path) -> std::io::Result<u64> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(source, destination).await
    }

    /// Delete a file, ignoring a missing one
    pub async fn remove_if_exists(path: &Path) -> std::io::Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Calculate percentage reduction
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}
