//! # Error Types Module
//!
//! Questo modulo definisce i tipi di errore dell'engine di compressione.
//!
//! ## Responsabilità:
//! - Definisce `CompressError` per categorizzare i fallimenti per singolo file
//! - Fornisce messaggi descrittivi che finiscono direttamente nella coda errori
//! - Integra con `thiserror` per la conversione automatica da `std::io::Error`
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O (copia, lettura metadata, creazione directory)
//! - `Spawn`: L'encoder esterno non può essere avviato
//! - `Conversion`: L'encoder è terminato con errore o ha prodotto un output troppo piccolo
//! - `Probe`: Analisi codec con ffprobe fallita
//! - `Path`: Path di input fuori dalla directory di input
//! - `Cancelled`: Run interrotto dall'utente
//! - `Panicked`: Panic catturato al confine del singolo file
//!
//! Nessuno di questi errori interrompe il run: vengono riportati e il file
//! viene comunque contato come processato.

use crate::config::MediaKind;

/// Custom error types for a single work item
#[derive(thiserror::Error, Debug)]
pub enum CompressError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{kind} conversion failed. (Code: {}). Output:\n{output}", display_code(.code))]
    Conversion {
        kind: MediaKind,
        code: Option<i32>,
        output: String,
    },

    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Path error: {0}")]
    Path(String),

    #[error("Cancelled before completion")]
    Cancelled,

    #[error("Unexpected panic: {0}")]
    Panicked(String),
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "killed".to_string(),
    }
}
