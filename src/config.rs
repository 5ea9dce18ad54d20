//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione del compressore.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con directory, impostazioni per tipo di media e liste estensioni
//! - Fornisce validazione dei parametri prima dell'avvio del run
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Impostazioni per tipo di media (`MediaConfig`):
//! - `enabled`: Abilita la compressione per questo tipo
//! - `min_size`: Dimensione minima in byte sotto la quale il file viene solo copiato
//! - `max_concurrent_workers`: Numero di worker dedicati
//! - `random_suffix_on_different_extension`: Suffisso casuale se cambia l'estensione
//! - `parameters_priority_list`: Preset ffmpeg in ordine di preferenza
//!
//! ## Esempio:
//! ```ignore
//! let mut config = Config::default();
//! config.input_directory = "/media/in".into();
//! config.output_directory = "/media/out".into();
//! config.validate()?;
//! ```

use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Media families handled by a dedicated worker pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Video,
    Image,
    Audio,
}

impl MediaKind {
    pub const ALL: [MediaKind; 3] = [MediaKind::Video, MediaKind::Image, MediaKind::Audio];

    /// Lowercase name used in diagnostics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Image => "image",
            Self::Audio => "audio",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "Video"),
            Self::Image => write!(f, "Image"),
            Self::Audio => write!(f, "Audio"),
        }
    }
}

/// One encoder preset: extra ffmpeg arguments plus the extension of the file it produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub parameters: String,
    pub extension: String,
}

impl Preset {
    pub fn new(parameters: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            parameters: parameters.into(),
            extension: extension.into(),
        }
    }
}

/// Per media type settings
#[derive(Debug, Clone, Serialize)]
pub struct MediaConfig {
    pub enabled: bool,
    /// Files smaller than this many bytes are copied instead of converted
    pub min_size: u64,
    pub max_concurrent_workers: usize,
    pub random_suffix_on_different_extension: bool,
    /// Index 0 is the preferred (slowest, best) preset; the last one is shared once the others are taken
    pub parameters_priority_list: Vec<Preset>,
}

impl MediaConfig {
    fn video_defaults() -> Self {
        Self {
            enabled: true,
            min_size: 1000 * 100,
            max_concurrent_workers: 1,
            random_suffix_on_different_extension: true,
            parameters_priority_list: vec![
                // cq goes from 0 - 51 (worst)
                Preset::new(
                    "-c:v hevc_nvenc -rc:v constqp -cq:v 26 -preset slow -c:a aac -b:a 256k -f mp4",
                    "mp4",
                ),
                Preset::new(
                    "-c:v libx265 -crf 26 -preset medium -c:a aac -b:a 256k -f mp4",
                    "mp4",
                ),
            ],
        }
    }

    fn image_defaults() -> Self {
        Self {
            enabled: true,
            min_size: 1000 * 30,
            max_concurrent_workers: 4,
            random_suffix_on_different_extension: true,
            parameters_priority_list: vec![Preset::new("-c:v libwebp -qscale 83", "webp")],
        }
    }

    fn audio_defaults() -> Self {
        Self {
            enabled: true,
            min_size: 1000 * 30,
            max_concurrent_workers: 4,
            random_suffix_on_different_extension: true,
            parameters_priority_list: vec![Preset::new("-c:a libopus -b:a 256k -vn", "ogg")],
        }
    }

    fn validate(&self, kind: MediaKind) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.parameters_priority_list.is_empty() {
            return Err(anyhow::anyhow!("{} parameters priority list can not be empty", kind));
        }
        if self.max_concurrent_workers == 0 {
            return Err(anyhow::anyhow!("{} max. concurrent workers must be greater than 0", kind));
        }
        if let Some(preset) = self
            .parameters_priority_list
            .iter()
            .find(|p| p.extension.trim().trim_start_matches('.').is_empty())
        {
            return Err(anyhow::anyhow!(
                "{} preset '{}' has no output extension",
                kind,
                preset.parameters
            ));
        }
        Ok(())
    }
}

/// Media object as written in the file: missing fields take the defaults of
/// their own media type
#[derive(Deserialize, Default)]
#[serde(default)]
struct MediaConfigFile {
    enabled: Option<bool>,
    min_size: Option<u64>,
    max_concurrent_workers: Option<usize>,
    random_suffix_on_different_extension: Option<bool>,
    parameters_priority_list: Option<Vec<Preset>>,
}

impl MediaConfigFile {
    fn merge_into(self, defaults: MediaConfig) -> MediaConfig {
        MediaConfig {
            enabled: self.enabled.unwrap_or(defaults.enabled),
            min_size: self.min_size.unwrap_or(defaults.min_size),
            max_concurrent_workers: self
                .max_concurrent_workers
                .unwrap_or(defaults.max_concurrent_workers),
            random_suffix_on_different_extension: self
                .random_suffix_on_different_extension
                .unwrap_or(defaults.random_suffix_on_different_extension),
            parameters_priority_list: self
                .parameters_priority_list
                .unwrap_or(defaults.parameters_priority_list),
        }
    }
}

fn video_media<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<MediaConfig, D::Error> {
    Ok(MediaConfigFile::deserialize(deserializer)?.merge_into(MediaConfig::video_defaults()))
}

fn image_media<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<MediaConfig, D::Error> {
    Ok(MediaConfigFile::deserialize(deserializer)?.merge_into(MediaConfig::image_defaults()))
}

fn audio_media<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<MediaConfig, D::Error> {
    Ok(MediaConfigFile::deserialize(deserializer)?.merge_into(MediaConfig::audio_defaults()))
}

/// Configuration for a compression run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input_directory: PathBuf,
    pub output_directory: PathBuf,
    #[serde(deserialize_with = "video_media")]
    pub video_compression: MediaConfig,
    #[serde(deserialize_with = "image_media")]
    pub image_compression: MediaConfig,
    #[serde(deserialize_with = "audio_media")]
    pub audio_compression: MediaConfig,
    pub video_extensions: Vec<String>,
    pub image_extensions: Vec<String>,
    pub audio_extensions: Vec<String>,
    /// Videos already using one of these codecs are copied as they are
    pub ignored_video_codecs: Vec<String>,
    /// Keep the original when the converted file turns out bigger
    pub delete_result_if_bigger: bool,
    /// Encoder executable (name on PATH or absolute path)
    pub encoder: String,
    /// Probe executable used to read the video codec
    pub probe: String,
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_directory: PathBuf::new(),
            output_directory: PathBuf::new(),
            video_compression: MediaConfig::video_defaults(),
            image_compression: MediaConfig::image_defaults(),
            audio_compression: MediaConfig::audio_defaults(),
            video_extensions: to_strings(&[
                "mp4", "mpg", "mts", "mov", "avi", "wmv", "webm", "flv", "mpeg", "mpv", "mxf",
            ]),
            image_extensions: to_strings(&["jpg", "jpeg", "png", "bmp"]),
            audio_extensions: to_strings(&["wav", "ogg", "oga", "wma", "mp3", "aac", "flac", "m4a"]),
            ignored_video_codecs: to_strings(&["av1"]),
            delete_result_if_bigger: true,
            encoder: "ffmpeg".to_string(),
            probe: "ffprobe".to_string(),
        }
    }
}

impl Config {
    /// Settings for one media type
    pub fn media(&self, kind: MediaKind) -> &MediaConfig {
        match kind {
            MediaKind::Video => &self.video_compression,
            MediaKind::Image => &self.image_compression,
            MediaKind::Audio => &self.audio_compression,
        }
    }

    /// Configured extension allow-list for one media type
    pub fn extensions(&self, kind: MediaKind) -> &[String] {
        match kind {
            MediaKind::Video => &self.video_extensions,
            MediaKind::Image => &self.image_extensions,
            MediaKind::Audio => &self.audio_extensions,
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        Self::validate_directory(&self.input_directory, "input")?;
        Self::validate_directory(&self.output_directory, "output")?;

        for kind in MediaKind::ALL {
            self.media(kind).validate(kind)?;
        }

        if self.encoder.trim().is_empty() {
            return Err(anyhow::anyhow!("Encoder executable can not be empty"));
        }

        Ok(())
    }

    fn validate_directory(path: &Path, label: &str) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("Invalid {} directory: not set", label));
        }
        if !path.is_dir() {
            return Err(anyhow::anyhow!("Invalid {} directory: {}", label, path.display()));
        }
        Ok(())
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse configuration file {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    fn config_with_dirs(input: &TempDir, output: &TempDir) -> Config {
        Config {
            input_directory: input.path().to_path_buf(),
            output_directory: output.path().to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.video_compression.min_size, 100_000);
        assert_eq!(config.video_compression.max_concurrent_workers, 1);
        assert_eq!(config.video_compression.parameters_priority_list.len(), 2);
        assert_eq!(config.image_compression.parameters_priority_list[0].extension, "webp");
        assert_eq!(config.audio_compression.parameters_priority_list[0].extension, "ogg");
        assert_eq!(config.ignored_video_codecs, vec!["av1".to_string()]);
        assert!(config.delete_result_if_bigger);
        assert_eq!(config.encoder, "ffmpeg");
    }

    #[test]
    fn test_config_validation() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let mut config = config_with_dirs(&input, &output);
        assert_ok!(config.validate());

        config.image_compression.parameters_priority_list.clear();
        assert_err!(config.validate());

        // disabled media types are not checked
        config.image_compression.enabled = false;
        assert_ok!(config.validate());

        config.audio_compression.max_concurrent_workers = 0;
        assert_err!(config.validate());

        config.audio_compression.max_concurrent_workers = 2;
        config.video_compression.parameters_priority_list[1].extension = " . ".to_string();
        assert_err!(config.validate());
    }

    #[test]
    fn test_config_rejects_missing_directories() {
        let input = TempDir::new().unwrap();
        let mut config = Config {
            input_directory: input.path().to_path_buf(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.output_directory = input.path().join("does-not-exist");
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("compressor-config.json");

        let mut original_config = Config::default();
        original_config.input_directory = PathBuf::from("/media/in");
        original_config.video_compression.max_concurrent_workers = 3;
        original_config.delete_result_if_bigger = false;

        original_config.save_to_file(&config_path).await.unwrap();
        let loaded_config = Config::from_file(&config_path).await.unwrap();

        assert_eq!(loaded_config.input_directory, PathBuf::from("/media/in"));
        assert_eq!(loaded_config.video_compression.max_concurrent_workers, 3);
        assert!(!loaded_config.delete_result_if_bigger);
        assert_eq!(
            loaded_config.video_compression.parameters_priority_list,
            original_config.video_compression.parameters_priority_list
        );
    }

    #[tokio::test]
    async fn test_partial_config_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("partial.json");
        tokio::fs::write(
            &config_path,
            r#"{ "input_directory": "/a", "audio_compression": { "enabled": false } }"#,
        )
        .await
        .unwrap();

        let config = Config::from_file(&config_path).await.unwrap();
        assert_eq!(config.input_directory, PathBuf::from("/a"));
        assert!(!config.audio_compression.enabled);
        assert_eq!(config.audio_compression.parameters_priority_list[0].extension, "ogg");
        assert_eq!(config.image_extensions.len(), 4);
    }

    #[test]
    fn test_partial_media_object_keeps_its_own_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "image_compression": { "min_size": 50000 } }"#).unwrap();

        let image = &config.image_compression;
        assert_eq!(image.min_size, 50_000);
        assert_eq!(image.max_concurrent_workers, 4);
        assert_eq!(image.parameters_priority_list.len(), 1);
        assert_eq!(image.parameters_priority_list[0].extension, "webp");
        assert!(image.parameters_priority_list[0].parameters.contains("libwebp"));

        let config: Config = serde_json::from_str(
            r#"{ "audio_compression": { "max_concurrent_workers": 2 }, "video_compression": { "enabled": false } }"#,
        )
        .unwrap();
        assert_eq!(config.audio_compression.max_concurrent_workers, 2);
        assert_eq!(config.audio_compression.min_size, 30_000);
        assert_eq!(config.audio_compression.parameters_priority_list[0].extension, "ogg");
        assert!(!config.video_compression.enabled);
        assert_eq!(config.video_compression.parameters_priority_list.len(), 2);
    }
}
