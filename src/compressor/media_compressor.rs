//! # Media Compressor Main Orchestrator
//!
//! Coordina un run completo: discovery dei file, avvio dei worker e dello
//! status reporter, classificazione nelle code e chiusura delle code.
//!
//! Tutti i task partono prima della classificazione. Il chiamante riceve un
//! `RunHandle` che si risolve una sola volta, a run completato o cancellato.

use crate::compressor::{
    classifier::{Classifier, Route, WorkQueues},
    parameters::ParameterAllocator,
    path_resolver::PathResolver,
    progress_tracker::ProgressTracker,
    status_reporter::{RunReport, StatusReporter},
    task_worker::{ConversionWorker, CopyWorker, WorkerShared},
};
use crate::config::{Config, MediaKind};
use crate::file_manager::FileManager;
use crate::progress::ProgressManager;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Punto di ingresso dell'engine
pub struct MediaCompressor {
    config: Config,
    cancel: CancellationToken,
    hidden_progress: bool,
}

impl MediaCompressor {
    pub fn new(config: Config, cancel: CancellationToken) -> Self {
        Self {
            config,
            cancel,
            hidden_progress: false,
        }
    }

    /// Non disegna mai la barra di progresso; la diagnostica va comunque su stderr
    pub fn with_hidden_progress(mut self) -> Self {
        self.hidden_progress = true;
        self
    }

    /// Classifica l'albero di input e avvia tutti i task del run
    pub async fn start(self) -> Result<RunHandle> {
        self.config.validate()?;

        let input = self.config.input_directory.clone();
        let output = self.config.output_directory.clone();

        let spinner = (!self.hidden_progress)
            .then(|| ProgressManager::spinner(&format!("Scanning {}", input.display())));
        let files = FileManager::discover_files(&input)
            .with_context(|| format!("Failed to list {}", input.display()))?;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        info!("Found {} files in {}", files.len(), input.display());

        let tracker = Arc::new(ProgressTracker::new(files.len()));
        let progress = if self.hidden_progress {
            ProgressManager::hidden(files.len() as u64)
        } else {
            ProgressManager::new(files.len() as u64)
        };

        let queues = WorkQueues::new();
        let shared = WorkerShared::new(
            &self.config,
            Arc::new(PathResolver::new(&input, &output)),
            tracker.clone(),
            self.cancel.clone(),
        );

        let mut workers = Vec::new();
        for kind in MediaKind::ALL {
            let media = self.config.media(kind);
            if !media.enabled {
                continue;
            }

            let allocator = ParameterAllocator::new(kind, media.parameters_priority_list.clone())
                .ok_or_else(|| anyhow::anyhow!("{} parameters priority list can not be empty", kind))?;
            let allocator = Arc::new(allocator);

            for id in 0..media.max_concurrent_workers {
                let worker = ConversionWorker::new(
                    id,
                    kind,
                    media.random_suffix_on_different_extension,
                    queues.receiver(Route::Convert(kind)),
                    allocator.clone(),
                    shared.clone(),
                );
                workers.push(tokio::spawn(worker.run()));
            }
            debug!("Started {} {} workers", media.max_concurrent_workers, kind.label());
        }
        workers.push(tokio::spawn(CopyWorker::new(queues.receiver(Route::Copy), shared).run()));

        let reporter = tokio::spawn(
            StatusReporter::new(tracker.clone(), progress.clone(), self.cancel.clone()).run(),
        );

        let classifier = Classifier::new(&self.config);
        let mut routed: HashMap<Route, usize> = HashMap::new();
        for file in files {
            let route = classifier.classify(&file.path, file.size);
            if queues.dispatch(route, file.path) {
                *routed.entry(route).or_default() += 1;
            }
        }
        queues.close();

        let count = |route: Route| routed.get(&route).copied().unwrap_or(0);
        info!(
            "Queued {} videos, {} images, {} audio files, {} plain copies",
            count(Route::Convert(MediaKind::Video)),
            count(Route::Convert(MediaKind::Image)),
            count(Route::Convert(MediaKind::Audio)),
            count(Route::Copy)
        );

        Ok(RunHandle {
            reporter,
            workers,
            tracker,
            progress,
        })
    }
}

/// Handle di completamento di un run avviato
pub struct RunHandle {
    reporter: JoinHandle<RunReport>,
    workers: Vec<JoinHandle<()>>,
    tracker: Arc<ProgressTracker>,
    progress: ProgressManager,
}

impl RunHandle {
    /// Si risolve una sola volta, a run completato o cancellato
    pub async fn wait(self) -> Result<RunReport> {
        let mut report = self.reporter.await.context("Status reporter task failed")?;

        // workers stop on their own: closed queues or cancellation
        for result in futures::future::join_all(self.workers).await {
            if let Err(e) = result {
                warn!("Worker task failed: {}", e);
            }
        }

        // items interrupted by a cancellation settle after the reporter stopped
        while let Some(error) = self.tracker.next_error() {
            self.progress.print_error(&error);
            report.errors.push(error);
        }
        while let Some(warning) = self.tracker.next_warning() {
            self.progress.print_warning(&warning);
            report.warnings.push(warning);
        }
        report.stats = self.tracker.stats().await;
        report.files_processed = self.tracker.processed();

        Ok(report)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::compressor::status_reporter::RunOutcome;
    use crate::config::Preset;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Encoder finto: il path di output è l'argomento prima del `-y` finale
    fn fake_encoder(dir: &Path, body: &str) -> PathBuf {
        let script = format!(
            "#!/bin/sh\nfor arg; do out=\"$prev\"; prev=\"$arg\"; done\n{}\n",
            body
        );
        write_script(dir, "fake-ffmpeg", &script)
    }

    fn write_script(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    struct Fixture {
        input: TempDir,
        output: TempDir,
        tools: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                input: TempDir::new().unwrap(),
                output: TempDir::new().unwrap(),
                tools: TempDir::new().unwrap(),
            }
        }

        fn add_file(&self, relative: &str, content: &[u8]) -> PathBuf {
            let path = self.input.path().join(relative);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, content).unwrap();
            path
        }

        fn out(&self, relative: &str) -> PathBuf {
            self.output.path().join(relative)
        }

        fn config(&self, encoder: &Path) -> Config {
            let mut config = Config {
                input_directory: self.input.path().to_path_buf(),
                output_directory: self.output.path().to_path_buf(),
                encoder: encoder.to_string_lossy().to_string(),
                ..Default::default()
            };
            config.ignored_video_codecs.clear();
            config.video_compression.parameters_priority_list = vec![Preset::new("-c:v libx265 -crf 26", "mp4")];
            config
        }
    }

    async fn run(config: Config) -> RunReport {
        let handle = MediaCompressor::new(config, CancellationToken::new())
            .with_hidden_progress()
            .start()
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(30), handle.wait())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_video_and_plain_file_are_routed_and_mirrored() {
        let fx = Fixture::new();
        fx.add_file("clips/movie.mp4", &vec![1u8; 200_000]);
        fx.add_file("notes.txt", &vec![b'n'; 10_000]);
        let encoder = fake_encoder(fx.tools.path(), "head -c 5000 /dev/zero > \"$out\"");

        let report = run(fx.config(&encoder)).await;

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.total_files, 2);
        assert_eq!(report.files_processed, 2);
        assert!(report.errors.is_empty());
        assert_eq!(std::fs::metadata(fx.out("clips/movie.mp4")).unwrap().len(), 5000);
        assert_eq!(std::fs::read(fx.out("notes.txt")).unwrap(), vec![b'n'; 10_000]);
        assert_eq!(report.stats.files_converted, 1);
        assert_eq!(report.stats.files_copied, 1);
    }

    #[tokio::test]
    async fn test_failing_encoder_leaves_exact_source_copy() {
        let fx = Fixture::new();
        let content: Vec<u8> = (0..150_000u32).map(|i| (i % 251) as u8).collect();
        fx.add_file("movie.mp4", &content);
        let encoder = fake_encoder(
            fx.tools.path(),
            "head -c 4000 /dev/zero > \"$out\"\necho 'Invalid data found when processing input' >&2\nexit 1",
        );

        let report = run(fx.config(&encoder)).await;

        assert_eq!(report.files_processed, 1);
        assert_eq!(std::fs::read(fx.out("movie.mp4")).unwrap(), content);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("Failed to convert video '"));
        assert!(report.errors[0].contains("(Code: 1)"));
        assert!(report.errors[0].contains("Invalid data found"));
        assert!(report.warnings.is_empty());
        assert_eq!(report.stats.files_fallback, 1);
    }

    #[tokio::test]
    async fn test_oversized_result_is_replaced_with_source() {
        let fx = Fixture::new();
        let content = vec![9u8; 40_000];
        fx.add_file("photos/cat.jpg", &content);
        let encoder = fake_encoder(fx.tools.path(), "head -c 100000 /dev/zero > \"$out\"");

        let report = run(fx.config(&encoder)).await;

        assert_eq!(report.files_processed, 1);
        assert!(report.errors.is_empty());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("Converted image was larger than original"));

        let outputs: Vec<PathBuf> = std::fs::read_dir(fx.out("photos"))
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(outputs.len(), 1);
        let name = outputs[0].file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("cat-") && name.ends_with(".webp"));
        assert_eq!(std::fs::read(&outputs[0]).unwrap(), content);
    }

    #[tokio::test]
    async fn test_unusable_destination_falls_back_to_plain_name() {
        let fx = Fixture::new();
        let content = vec![6u8; 40_000];
        fx.add_file("photos/cat.jpg", &content);
        let encoder = fake_encoder(fx.tools.path(), "mkdir \"$out\"\nexit 1");

        let report = run(fx.config(&encoder)).await;

        assert_eq!(report.files_processed, 1);
        assert_eq!(std::fs::read(fx.out("photos/cat.webp")).unwrap(), content);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors.iter().any(|e| e.starts_with("Failed to copy file '")));
        assert!(report.errors.iter().any(|e| e.starts_with("Failed to convert image '")));
        // counted once, for the copy that actually landed
        assert_eq!(report.stats.files_fallback, 1);
    }

    #[tokio::test]
    async fn test_bigger_result_kept_when_policy_disabled() {
        let fx = Fixture::new();
        fx.add_file("song.wav", &vec![3u8; 40_000]);
        let encoder = fake_encoder(fx.tools.path(), "head -c 60000 /dev/zero > \"$out\"");
        let mut config = fx.config(&encoder);
        config.delete_result_if_bigger = false;
        config.audio_compression.random_suffix_on_different_extension = false;

        let report = run(config).await;

        assert!(report.warnings.is_empty());
        assert_eq!(std::fs::metadata(fx.out("song.ogg")).unwrap().len(), 60_000);
    }

    #[tokio::test]
    async fn test_too_small_output_is_a_failure() {
        let fx = Fixture::new();
        let content = vec![5u8; 120_000];
        fx.add_file("movie.mp4", &content);
        let encoder = fake_encoder(fx.tools.path(), "head -c 10 /dev/zero > \"$out\"");

        let report = run(fx.config(&encoder)).await;

        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("(Code: 0)"));
        assert_eq!(std::fs::read(fx.out("movie.mp4")).unwrap(), content);
    }

    #[tokio::test]
    async fn test_ignored_codec_is_copied_without_encoding() {
        let fx = Fixture::new();
        let content = vec![2u8; 150_000];
        fx.add_file("movie.mov", &content);
        let encoder = fake_encoder(fx.tools.path(), "exit 1");
        let probe = write_script(
            fx.tools.path(),
            "fake-ffprobe",
            "#!/bin/sh\necho '{\"streams\":[{\"codec_type\":\"video\",\"codec_name\":\"av1\"}]}'\n",
        );
        let mut config = fx.config(&encoder);
        config.probe = probe.to_string_lossy().to_string();
        config.ignored_video_codecs = vec!["AV1".to_string()];
        config.video_compression.random_suffix_on_different_extension = false;

        let report = run(config).await;

        assert!(report.errors.is_empty());
        assert_eq!(report.stats.files_ignored, 1);
        assert_eq!(std::fs::read(fx.out("movie.mp4")).unwrap(), content);
    }

    #[tokio::test]
    async fn test_missing_encoder_still_copies_everything() {
        let fx = Fixture::new();
        let content = vec![4u8; 200_000];
        fx.add_file("a/movie.mp4", &content);
        let config = fx.config(Path::new("/definitely/not/here/ffmpeg"));

        let report = run(config).await;

        assert!(report.is_complete());
        assert_eq!(report.errors.len(), 1);
        assert_eq!(std::fs::read(fx.out("a/movie.mp4")).unwrap(), content);
    }

    #[tokio::test]
    async fn test_empty_input_completes() {
        let fx = Fixture::new();
        let report = run(fx.config(Path::new("ffmpeg"))).await;
        assert!(report.is_complete());
        assert_eq!(report.total_files, 0);
        assert_eq!(report.files_processed, 0);
    }

    #[tokio::test]
    async fn test_many_files_are_processed_exactly_once() {
        let fx = Fixture::new();
        for i in 0..30 {
            fx.add_file(&format!("docs/{}/file-{}.txt", i % 3, i), b"plain");
        }
        for i in 0..12 {
            fx.add_file(&format!("music/track-{}.wav", i), &vec![1u8; 40_000]);
        }
        let encoder = fake_encoder(fx.tools.path(), "head -c 2000 /dev/zero > \"$out\"");
        let mut config = fx.config(&encoder);
        config.audio_compression.max_concurrent_workers = 3;
        config.audio_compression.random_suffix_on_different_extension = false;
        config.audio_compression.parameters_priority_list = vec![
            Preset::new("-c:a libopus -b:a 256k", "ogg"),
            Preset::new("-c:a libopus -b:a 128k", "ogg"),
        ];

        let report = run(config).await;

        assert_eq!(report.files_processed, 42);
        assert!(report.errors.is_empty());
        assert_eq!(report.stats.files_converted, 12);
        assert_eq!(report.stats.files_copied, 30);
        for i in 0..12 {
            assert!(fx.out(&format!("music/track-{}.ogg", i)).exists());
        }
        assert!(fx.out("docs/2/file-29.txt").exists());
    }

    #[tokio::test]
    async fn test_cancellation_kills_encoder_and_resolves() {
        let fx = Fixture::new();
        fx.add_file("movie.mp4", &vec![1u8; 200_000]);
        let started = fx.tools.path().join("encoder-started");
        let encoder = fake_encoder(
            fx.tools.path(),
            &format!("touch '{}'\nexec sleep 30", started.display()),
        );
        let cancel = CancellationToken::new();

        let handle = MediaCompressor::new(fx.config(&encoder), cancel.clone())
            .with_hidden_progress()
            .start()
            .await
            .unwrap();
        for _ in 0..200 {
            if started.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        assert!(started.exists());
        cancel.cancel();

        let report = tokio::time::timeout(Duration::from_secs(10), handle.wait())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.outcome, RunOutcome::Cancelled);
        assert!(!fx.out("movie.mp4").exists());
        assert_eq!(report.files_processed, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("Cancelled before completion"));
        assert_eq!(report.stats.errors, 1);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let fx = Fixture::new();
        let mut config = fx.config(Path::new("ffmpeg"));
        config.output_directory = fx.output.path().join("missing");
        let result = MediaCompressor::new(config, CancellationToken::new())
            .with_hidden_progress()
            .start()
            .await;
        assert!(result.is_err());
    }
}
