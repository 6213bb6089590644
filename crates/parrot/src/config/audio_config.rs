use crate::config::{default_bits_per_sample, default_status_interval_ms};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Microphone capture configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Where recordings are written (None = platform data dir).
    #[serde(default)]
    pub recordings_dir: Option<PathBuf>,
    /// PCM sample width of recordings: 16 or 32.
    #[serde(default = "default_bits_per_sample")]
    pub bits_per_sample: u16,
    /// Recordings stop on their own after this long (None = no limit).
    #[serde(default)]
    pub max_recording_ms: Option<u64>,
    /// How often devices report progress.
    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            recordings_dir: None,
            bits_per_sample: default_bits_per_sample(),
            max_recording_ms: None,
            status_interval_ms: default_status_interval_ms(),
        }
    }
}
