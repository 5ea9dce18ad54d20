//! # Platform-specific utilities
//!
//! Questo modulo centralizza la risoluzione cross-platform degli eseguibili
//! esterni (ffmpeg, ffprobe) e il controllo della loro disponibilità prima
//! dell'avvio del run.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

/// Platform-specific command manager
pub struct PlatformCommands {
    commands: HashMap<&'static str, &'static str>,
    which_command: &'static str,
}

impl PlatformCommands {
    /// Get the singleton instance
    pub fn instance() -> &'static Self {
        static INSTANCE: OnceLock<PlatformCommands> = OnceLock::new();
        INSTANCE.get_or_init(Self::new)
    }

    fn new() -> Self {
        let mut commands = HashMap::new();
        let which_command = if cfg!(windows) {
            commands.insert("ffmpeg", "ffmpeg.exe");
            commands.insert("ffprobe", "ffprobe.exe");
            "where"
        } else {
            commands.insert("ffmpeg", "ffmpeg");
            commands.insert("ffprobe", "ffprobe");
            "which"
        };

        Self {
            commands,
            which_command,
        }
    }

    /// Get the platform-specific command name; unknown names and paths are returned as they are
    pub fn get_command<'a>(&self, base_name: &'a str) -> &'a str {
        match self.commands.get(base_name) {
            Some(command) => *command,
            None => base_name,
        }
    }

    /// Check if a command is available, either as an explicit path or on PATH
    pub async fn is_command_available(&self, base_name: &str) -> bool {
        let command_name = self.get_command(base_name);

        if Path::new(command_name).components().count() > 1 {
            return Path::new(command_name).is_file();
        }

        let result = tokio::process::Command::new(self.which_command)
            .arg(command_name)
            .output()
            .await;

        match result {
            Ok(output) => output.status.success(),
            Err(e) => {
                debug!("{} {} failed: {}", self.which_command, command_name, e);
                false
            }
        }
    }
}
