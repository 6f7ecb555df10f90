use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::input::hotkey::HotkeyCombo;

/// Application configuration, loaded from `~/.voice-typer.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Transcription service settings.
    pub transcription: TranscriptionConfig,
    /// Hotkey settings.
    pub hotkey: HotkeyConfig,
    /// Recording storage settings.
    pub recording: RecordingConfig,
    /// Persistent transcript log settings.
    pub log: LogConfig,
    /// Telemetry settings.
    pub telemetry: TelemetryConfig,
}

/// Credential and model for the transcription service.
#[derive(Debug, Deserialize, Clone)]
pub struct TranscriptionConfig {
    /// Deepgram API key. Empty until the user configures one.
    pub api_key: String,
    /// Recognition model identifier.
    pub model: String,
}

/// Configured toggle combination.
#[derive(Debug, Deserialize, Clone)]
pub struct HotkeyConfig {
    /// One of the fixed supported combinations.
    pub combo: HotkeyCombo,
}

/// Where recordings land between capture and transcription.
#[derive(Debug, Deserialize, Clone)]
pub struct RecordingConfig {
    /// Recordings directory (`~` is expanded).
    pub dir: String,
    /// Play an audible cue on recording start/stop.
    pub chime: bool,
}

/// Persistent transcript log location.
#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    /// Transcript log path (`~` is expanded).
    pub transcript_path: String,
}

/// Telemetry logging settings.
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    /// Write telemetry to a file instead of stdout.
    pub enabled: bool,
    /// Telemetry log path (`~` is expanded).
    pub log_path: String,
}

/// Config file contents written on first run.
const DEFAULT_CONFIG: &str = r#"[transcription]
# Deepgram API key; requests are rejected until this is set
api_key = ""
model = "nova-3"

[hotkey]
# One of: "f2", "alt+f2", "ctrl+f12", "alt+f12"
combo = "f2"

[recording]
dir = "~/.voice-typer/recordings"
chime = true

[log]
transcript_path = "~/.voice-typer/transcribe.log"

[telemetry]
enabled = true
log_path = "~/.voice-typer/voice-typer.log"
"#;

impl Config {
    /// Loads the config from `~/.voice-typer.toml`, creating it with
    /// defaults on first run.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, created or parsed.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG)
                .context("failed to create default config")?;
        }

        let contents = fs::read_to_string(&config_path).context("failed to read config file")?;

        let config: Self = toml::from_str(&contents).context("failed to parse config TOML")?;

        Ok(config)
    }

    fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Ok(PathBuf::from(home).join(".voice-typer.toml"))
    }

    /// Expands `~` in paths to the home directory.
    ///
    /// # Errors
    /// Returns error if `HOME` is not set.
    pub fn expand_path(path: &str) -> Result<PathBuf> {
        if let Some(stripped) = path.strip_prefix("~/") {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            Ok(PathBuf::from(home).join(stripped))
        } else {
            Ok(PathBuf::from(path))
        }
    }
}
