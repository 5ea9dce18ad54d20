//! # Classification Module
//!
//! Smista ogni file scoperto in una delle quattro code di lavoro (video,
//! immagini, audio, copia semplice) in base a estensione, dimensione minima e
//! flag di abilitazione. L'ordine di valutazione è fisso: video, immagine,
//! audio, altrimenti copia.

use crate::config::{Config, MediaKind};
use crate::file_manager::FileManager;
use async_channel as chan;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Coda a cui viene mandato un file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Convert(MediaKind),
    Copy,
}

struct MediaRule {
    kind: MediaKind,
    enabled: bool,
    min_size: u64,
    extensions: HashSet<String>,
}

/// Smistamento per estensione, dimensione e flag di abilitazione
pub struct Classifier {
    rules: Vec<MediaRule>,
}

impl Classifier {
    pub fn new(config: &Config) -> Self {
        let rules = MediaKind::ALL
            .iter()
            .map(|&kind| {
                let media = config.media(kind);
                MediaRule {
                    kind,
                    enabled: media.enabled,
                    min_size: media.min_size,
                    extensions: config
                        .extensions(kind)
                        .iter()
                        .map(|ext| FileManager::normalize_extension(ext))
                        .filter(|ext| !ext.is_empty())
                        .collect(),
                }
            })
            .collect();

        Self { rules }
    }

    /// Coda per un file della dimensione data
    pub fn classify(&self, path: &Path, size: u64) -> Route {
        let extension = FileManager::extension_of(path);

        self.rules
            .iter()
            .find(|rule| rule.enabled && rule.extensions.contains(&extension) && size >= rule.min_size)
            .map(|rule| Route::Convert(rule.kind))
            .unwrap_or(Route::Copy)
    }
}

struct Queue {
    tx: chan::Sender<PathBuf>,
    rx: chan::Receiver<PathBuf>,
}

impl Queue {
    fn new() -> Self {
        let (tx, rx) = chan::unbounded();
        Self { tx, rx }
    }
}

/// Le quattro code FIFO di un run.
///
/// La chiusura delle code segna la fine della classificazione: i worker
/// svuotano quello che resta e si fermano a coda chiusa e vuota.
pub struct WorkQueues {
    video: Queue,
    image: Queue,
    audio: Queue,
    copy: Queue,
}

impl WorkQueues {
    pub fn new() -> Self {
        Self {
            video: Queue::new(),
            image: Queue::new(),
            audio: Queue::new(),
            copy: Queue::new(),
        }
    }

    fn queue(&self, route: Route) -> &Queue {
        match route {
            Route::Convert(MediaKind::Video) => &self.video,
            Route::Convert(MediaKind::Image) => &self.image,
            Route::Convert(MediaKind::Audio) => &self.audio,
            Route::Copy => &self.copy,
        }
    }

    /// Lato consumer di una coda
    pub fn receiver(&self, route: Route) -> chan::Receiver<PathBuf> {
        self.queue(route).rx.clone()
    }

    /// Accoda un file; restituisce false se le code sono già chiuse
    pub fn dispatch(&self, route: Route, path: PathBuf) -> bool {
        match self.queue(route).tx.try_send(path) {
            Ok(()) => true,
            Err(e) => {
                warn!("Work queue closed, dropping {}", e.into_inner().display());
                false
            }
        }
    }

    /// Numero di file in attesa in una coda
    pub fn pending(&self, route: Route) -> usize {
        self.queue(route).rx.len()
    }

    /// Segnala la fine della classificazione
    pub fn close(&self) {
        self.video.tx.close();
        self.image.tx.close();
        self.audio.tx.close();
        self.copy.tx.close();
    }
}

impl Default for WorkQueues {
    fn default() -> Self {
        Self::new()
    }
}
