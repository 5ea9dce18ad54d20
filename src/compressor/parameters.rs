//! # Parameter Allocation Module
//!
//! Assegna i preset ffmpeg ai worker di un tipo di media.
//!
//! Il primo slot libero (in ordine di priorità) viene marcato come occupato e
//! restituito; quando tutti gli slot esclusivi sono occupati si ripiega
//! sull'ultimo preset, che non viene mai tenuto in esclusiva e può essere
//! condiviso da un numero qualsiasi di worker.

use crate::config::{MediaKind, Preset};
use tokio::sync::Mutex;
use tracing::debug;

/// Preset assegnato a un worker, con lo slot da restituire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSlot {
    pub index: usize,
    pub preset: Preset,
}

/// Allocatore a indice libero più basso, con l'ultimo preset condiviso
pub struct ParameterAllocator {
    kind: MediaKind,
    presets: Vec<Preset>,
    /// Un flag per preset tranne l'ultimo, mai tenuto in esclusiva
    in_use: Mutex<Vec<bool>>,
}

impl ParameterAllocator {
    /// Restituisce `None` se `presets` è vuota
    pub fn new(kind: MediaKind, presets: Vec<Preset>) -> Option<Self> {
        if presets.is_empty() {
            return None;
        }
        let exclusive = presets.len() - 1;
        Some(Self {
            kind,
            presets,
            in_use: Mutex::new(vec![false; exclusive]),
        })
    }

    fn last_index(&self) -> usize {
        self.presets.len() - 1
    }

    /// Prende il miglior preset disponibile
    pub async fn acquire(&self) -> ParameterSlot {
        let mut in_use = self.in_use.lock().await;

        let index = match in_use.iter().position(|used| !used) {
            Some(index) => {
                in_use[index] = true;
                index
            }
            None => self.last_index(),
        };
        drop(in_use);

        debug!("{} parameters slot {} taken", self.kind.label(), index);
        ParameterSlot {
            index,
            preset: self.presets[index].clone(),
        }
    }

    /// Restituisce uno slot; rilasciare l'ultimo (condiviso) non fa nulla
    pub async fn release(&self, index: usize) {
        let mut in_use = self.in_use.lock().await;
        if let Some(used) = in_use.get_mut(index) {
            *used = false;
        }
        debug!("{} parameters slot {} released", self.kind.label(), index);
    }

    /// Numero di slot tenuti in esclusiva
    #[cfg(test)]
    pub(crate) async fn held(&self) -> usize {
        self.in_use.lock().await.iter().filter(|used| **used).count()
    }
}
