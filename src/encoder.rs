//! # Encoder Invocation Module
//!
//! Questo modulo gestisce l'esecuzione dell'encoder esterno (ffmpeg) e l'analisi
//! del codec con ffprobe.
//!
//! ## Responsabilità:
//! - Avvio dell'encoder come processo esterno, non interattivo, con overwrite forzato
//! - Cattura riga per riga dello standard error come testo diagnostico
//! - Attesa asincrona dell'uscita con supporto alla cancellazione
//! - Lettura del codec video tramite output JSON di ffprobe
//!
//! ## Comando eseguito:
//! ```text
//! ffmpeg -hide_banner -i <input> <parametri del preset> <output> -y
//! ```
//!
//! L'exit code e la dimensione del file prodotto sono gli unici segnali di
//! successo: l'output di progresso di ffmpeg non viene interpretato.

use crate::args;
use crate::config::Config;
use crate::error::CompressError;
use crate::platform::PlatformCommands;
use crate::utils::split_parameters;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Result of one encoder process
#[derive(Debug, Clone)]
pub struct EncodeRun {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    /// Everything the encoder wrote on stderr
    pub output: String,
}

impl EncodeRun {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs the external encoder and probe tools
#[derive(Debug, Clone)]
pub struct Encoder {
    program: String,
    probe: String,
}

impl Encoder {
    pub fn new(program: impl Into<String>, probe: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            probe: probe.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.encoder.clone(), config.probe.clone())
    }

    /// Encode `input` into `output` with the given preset parameters.
    ///
    /// If `cancel` fires while the encoder runs, the process is killed and
    /// `CompressError::Cancelled` is returned. The child is also killed if this
    /// future is dropped.
    pub async fn encode(
        &self,
        input: &Path,
        parameters: &str,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<EncodeRun, CompressError> {
        let program = PlatformCommands::instance().get_command(&self.program);

        debug!(
            "Running {} -hide_banner -i {} {} {} -y",
            program,
            input.display(),
            parameters,
            output.display()
        );

        let mut child = Command::new(program)
            .arg("-hide_banner")
            .arg("-i")
            .arg(input)
            .args(split_parameters(parameters))
            .arg(output)
            .arg("-y")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CompressError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let stderr = child.stderr.take();
        let collector = tokio::spawn(async move {
            let mut text = String::new();
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    text.push_str(&line);
                    text.push('\n');
                }
            }
            text
        });

        let start_time = std::time::Instant::now();
        let status = tokio::select! {
            status = child.wait() => status?,
            _ = cancel.cancelled() => {
                if let Err(e) = child.kill().await {
                    debug!("Failed to kill {} for {}: {}", program, input.display(), e);
                }
                collector.abort();
                return Err(CompressError::Cancelled);
            }
        };

        let output_text = collector.await.unwrap_or_default();
        debug!(
            "{} exited with {:?} after {:.1}s for {}",
            program,
            status.code(),
            start_time.elapsed().as_secs_f64(),
            input.display()
        );

        Ok(EncodeRun {
            exit_code: status.code(),
            output: output_text,
        })
    }

    /// Lowercase codec name of the first video stream, `None` if the file has no video stream
    pub async fn probe_video_codec(&self, path: &Path) -> Result<Option<String>, CompressError> {
        let program = PlatformCommands::instance().get_command(&self.probe);

        let output = Command::new(program)
            .args(args!["-v", "quiet", "-print_format", "json", "-show_streams"])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| CompressError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(CompressError::Probe(format!(
                "{} exited with {:?} for {}",
                program,
                output.status.code(),
                path.display()
            )));
        }

        parse_video_codec(&output.stdout)
    }
}

fn parse_video_codec(json: &[u8]) -> Result<Option<String>, CompressError> {
    let info: serde_json::Value =
        serde_json::from_slice(json).map_err(|e| CompressError::Probe(e.to_string()))?;

    let codec = info["streams"]
        .as_array()
        .and_then(|streams| streams.iter().find(|s| s["codec_type"] == "video"))
        .and_then(|stream| stream["codec_name"].as_str())
        .map(|codec| codec.trim().to_lowercase());

    Ok(codec)
}
