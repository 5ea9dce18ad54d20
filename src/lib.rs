//! # Space Media Compressor Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Configurazione JSON, default e validazione
//! - `error`: Errori per singolo file
//! - `file_manager`: Discovery ricorsiva e operazioni sui file
//! - `encoder`: Invocazione di ffmpeg e ffprobe
//! - `compressor`: Code di lavoro, worker e orchestratore del run
//! - `progress`: Barra di progresso e statistiche
//! - `platform`: Risoluzione dei comandi esterni
//!
//! ## Utilizzo:
//! ```ignore
//! use space_media_compressor::{Config, MediaCompressor};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = Config::from_file("compressor-config.json".as_ref()).await?;
//! let report = MediaCompressor::new(config, CancellationToken::new())
//!     .start()
//!     .await?
//!     .wait()
//!     .await?;
//! println!("{}", report.stats.format_summary());
//! ```

pub mod compressor;
pub mod config;
pub mod encoder;
pub mod error;
pub mod file_manager;
pub mod platform;
pub mod progress;
pub mod utils;

pub use compressor::{MediaCompressor, RunHandle, RunOutcome, RunReport};
pub use config::{Config, MediaConfig, MediaKind, Preset};
pub use error::CompressError;
