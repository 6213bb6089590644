use crate::config::{default_rate_scale, default_stop_at_end};

use serde::{Deserialize, Serialize};

/// Playback behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Rewind to the start when a clip plays to its end.
    #[serde(default = "default_stop_at_end")]
    pub stop_at_end: bool,
    /// The rate slider's `[0, 1]` maps to `[0, rate_scale]`.
    #[serde(default = "default_rate_scale")]
    pub rate_scale: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            stop_at_end: default_stop_at_end(),
            rate_scale: default_rate_scale(),
        }
    }
}
