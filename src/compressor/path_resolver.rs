//! # Path Resolution Module
//!
//! Centralizza il calcolo dei path di output: la struttura delle sottodirectory
//! di input viene replicata sotto la directory di output.

use crate::error::CompressError;
use crate::file_manager::FileManager;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::path::{Path, PathBuf};
use tracing::debug;

const SUFFIX_LENGTH: usize = 6;

/// Destinazioni di un file convertito
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTargets {
    /// Path di output dell'encoder, eventualmente con suffisso casuale
    pub destination: PathBuf,
    /// Stesso nome senza suffisso, usato se nient'altro è finito su disco
    pub fallback: PathBuf,
}

impl OutputTargets {
    pub fn is_suffixed(&self) -> bool {
        self.destination != self.fallback
    }
}

/// Replica i path di input sotto la directory di output
#[derive(Debug, Clone)]
pub struct PathResolver {
    input_root: PathBuf,
    output_root: PathBuf,
}

impl PathResolver {
    pub fn new(input_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            input_root: input_root.into(),
            output_root: output_root.into(),
        }
    }

    /// Directory di output corrispondente al parent di `source`
    fn mirrored_dir(&self, source: &Path) -> Result<PathBuf, CompressError> {
        let relative = source.strip_prefix(&self.input_root).map_err(|_| {
            CompressError::Path(format!(
                "{} is not inside {}",
                source.display(),
                self.input_root.display()
            ))
        })?;

        Ok(self
            .output_root
            .join(relative.parent().unwrap_or_else(|| Path::new(""))))
    }

    /// Destinazione di una copia semplice: stesso path relativo, stesso nome
    pub fn copy_destination(&self, source: &Path) -> Result<PathBuf, CompressError> {
        let file_name = source
            .file_name()
            .ok_or_else(|| CompressError::Path(format!("Invalid file name: {}", source.display())))?;
        Ok(self.mirrored_dir(source)?.join(file_name))
    }

    /// Calcola le destinazioni di una conversione che produce `extension`.
    ///
    /// Se l'estensione cambia e `suffix_on_change` è attivo, al nome viene
    /// aggiunto un token casuale: `clip.mov` e `clip.mp4` non finiscono mai
    /// sullo stesso file di output.
    pub fn conversion_targets(
        &self,
        source: &Path,
        extension: &str,
        suffix_on_change: bool,
    ) -> Result<OutputTargets, CompressError> {
        let stem = source
            .file_stem()
            .ok_or_else(|| CompressError::Path(format!("Invalid file name: {}", source.display())))?
            .to_string_lossy();
        let extension = FileManager::normalize_extension(extension);
        let directory = self.mirrored_dir(source)?;

        let fallback = directory.join(format!("{}.{}", stem, extension));
        let destination = if suffix_on_change && FileManager::extension_of(source) != extension {
            directory.join(format!("{}-{}.{}", stem, random_token(), extension))
        } else {
            fallback.clone()
        };

        debug!("Resolved output path: {} -> {}", source.display(), destination.display());
        Ok(OutputTargets {
            destination,
            fallback,
        })
    }

    /// Crea le directory parent se necessario
    pub async fn ensure_parent_dirs(path: &Path) -> Result<(), CompressError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LENGTH)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect()
}
