//! Configuration management for parrot.
//!
//! Handles loading and saving TOML configuration files with cross-platform
//! paths, validation, and atomic write operations.

use crate::{
    AppError, AppResult,
    config::{AudioConfig, ClipsConfig, PlaybackConfig},
};

use std::{
    fs,
    io::Write,
    panic::Location,
    path::{Path, PathBuf},
    time::Duration,
};

use directories::ProjectDirs;
use error_location::ErrorLocation;
use parrot_core::{ClipUrlTemplate, CoordinatorOptions, RecordingSettings};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Main configuration struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Microphone capture configuration.
    #[serde(default)]
    pub audio: AudioConfig,
    /// Reference clip source.
    #[serde(default)]
    pub clips: ClipsConfig,
    /// Playback behavior.
    #[serde(default)]
    pub playback: PlaybackConfig,
}

impl Config {
    /// Load configuration from the platform config dir, creating a default
    /// file if none exists.
    #[track_caller]
    #[instrument]
    pub fn load() -> AppResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            info!("No config found, creating default");
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from `path`. Missing sections and keys take their
    /// defaults.
    #[track_caller]
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to read config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?path, "Configuration loaded");

        Ok(config)
    }

    /// Reject values the audio stack cannot work with.
    #[track_caller]
    pub fn validate(&self) -> AppResult<()> {
        let invalid = |reason: String| AppError::ConfigError {
            reason,
            location: ErrorLocation::from(Location::caller()),
        };

        if self.audio.status_interval_ms == 0 {
            return Err(invalid(
                "audio.status_interval_ms must be greater than 0".to_string(),
            ));
        }
        if !matches!(self.audio.bits_per_sample, 16 | 32) {
            return Err(invalid(format!(
                "audio.bits_per_sample must be 16 or 32, got {}",
                self.audio.bits_per_sample
            )));
        }
        if self.audio.max_recording_ms == Some(0) {
            return Err(invalid(
                "audio.max_recording_ms must be greater than 0 when set".to_string(),
            ));
        }
        if !(self.playback.rate_scale.is_finite() && self.playback.rate_scale > 0.0) {
            return Err(invalid(format!(
                "playback.rate_scale must be positive, got {}",
                self.playback.rate_scale
            )));
        }
        if self.clips.host.trim().is_empty() {
            return Err(invalid("clips.host must not be empty".to_string()));
        }

        Ok(())
    }

    /// Save configuration to `path` using atomic write pattern.
    ///
    /// Writes to a temporary file first, then renames to prevent corruption
    /// if the process crashes during the write.
    #[track_caller]
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        // Atomic write: write to temp file then rename
        let temp_path = path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to create temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to write temp config file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        temp_file.sync_all().map_err(|e| AppError::ConfigError {
            reason: format!("Failed to sync temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::rename(&temp_path, path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to rename temp config to final: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?path, "Configuration saved (atomic write)");

        Ok(())
    }

    /// Recording settings handed to every recorder.
    pub fn recording_settings(&self) -> RecordingSettings {
        RecordingSettings {
            bits_per_sample: self.audio.bits_per_sample,
            max_duration_ms: self.audio.max_recording_ms,
            status_interval_ms: self.audio.status_interval_ms,
        }
    }

    /// Options for the session coordinator.
    pub fn coordinator_options(&self) -> CoordinatorOptions {
        CoordinatorOptions {
            recording_settings: self.recording_settings(),
            stop_at_end: self.playback.stop_at_end,
        }
    }

    /// Status reporting period for loaded sounds.
    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.audio.status_interval_ms)
    }

    /// URL template for reference clips.
    pub fn clip_template(&self) -> ClipUrlTemplate {
        ClipUrlTemplate::new(self.clips.host.clone(), self.clips.prefix.clone())
    }

    /// Recordings directory, falling back to the platform data dir.
    #[track_caller]
    pub fn recordings_dir(&self) -> AppResult<PathBuf> {
        match &self.audio.recordings_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::project_dirs()?.data_dir().join("recordings")),
        }
    }

    /// Clip cache directory, falling back to the platform cache dir.
    #[track_caller]
    pub fn clip_cache_dir(&self) -> AppResult<PathBuf> {
        match &self.clips.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::project_dirs()?.cache_dir().join("clips")),
        }
    }

    /// Platform data directory.
    #[track_caller]
    pub fn data_dir() -> AppResult<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    #[track_caller]
    fn project_dirs() -> AppResult<ProjectDirs> {
        ProjectDirs::from("com", "parrot", "Parrot").ok_or_else(|| AppError::ConfigError {
            reason: "Failed to get project directories".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    #[track_caller]
    fn config_path() -> AppResult<PathBuf> {
        let proj_dirs = Self::project_dirs()?;
        let config_dir = proj_dirs.config_dir();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            debug!(config_dir = ?config_dir, "Created config directory");
        }

        Ok(config_dir.join("config.toml"))
    }

    #[track_caller]
    fn create_default(path: &Path) -> AppResult<Self> {
        let config = Config::default();
        config.save_to(path)?;
        info!(config_path = ?path, "Default config created");
        Ok(config)
    }
}
