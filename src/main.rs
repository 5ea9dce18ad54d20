//! # Space Media Compressor - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento (o creazione) del file di configurazione
//! - Controllo della disponibilità di ffmpeg/ffprobe
//! - Avvio del run e gestione di Ctrl-C
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (config, input, output, verbose)
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose)
//! 3. Se il file di configurazione manca ne crea uno di default ed esce
//! 4. Applica gli override da CLI e valida la configurazione
//! 5. Avvia MediaCompressor e attende il completamento o la cancellazione
//!
//! ## Esempio di utilizzo:
//! ```bash
//! media-compressor --config compressor-config.json --input /media/in --output /media/out
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use space_media_compressor::platform::PlatformCommands;
use space_media_compressor::utils::format_duration;
use space_media_compressor::{Config, MediaCompressor, RunOutcome};

#[derive(Parser)]
#[command(name = "media-compressor")]
#[command(about = "Compress a media library into a mirrored output directory with ffmpeg")]
struct Args {
    /// Configuration file (created with defaults when missing)
    #[arg(short, long, default_value = "compressor-config.json")]
    config: PathBuf,

    /// Input directory, overrides the configuration file
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output directory, overrides the configuration file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    if !args.config.exists() {
        Config::default().save_to_file(&args.config).await?;
        println!("No configuration file found. Created new one.");
        println!("Edit {} and run again.", args.config.display());
        return Ok(());
    }

    let mut config = Config::from_file(&args.config).await?;
    if let Some(input) = args.input {
        config.input_directory = input;
    }
    if let Some(output) = args.output {
        config.output_directory = output;
    }
    config.validate()?;

    let platform = PlatformCommands::instance();
    if !platform.is_command_available(&config.encoder).await {
        return Err(anyhow::anyhow!(
            "Encoder '{}' not found. Install ffmpeg or set \"encoder\" in {}",
            config.encoder,
            args.config.display()
        ));
    }
    if !config.ignored_video_codecs.is_empty() && !platform.is_command_available(&config.probe).await {
        warn!(
            "Probe '{}' not found, ignored video codecs will not be detected",
            config.probe
        );
    }

    info!(
        "Compressing {} -> {}",
        config.input_directory.display(),
        config.output_directory.display()
    );

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping workers");
            ctrl_c_token.cancel();
        }
    });

    let start_time = Instant::now();
    let report = MediaCompressor::new(config, cancel).start().await?.wait().await?;

    println!("{}", report.stats.format_summary());
    if report.outcome == RunOutcome::Cancelled {
        println!(
            "Cancelled after {}/{} files",
            report.files_processed, report.total_files
        );
    }
    println!("Done ({})", format_duration(start_time.elapsed()));

    Ok(())
}
