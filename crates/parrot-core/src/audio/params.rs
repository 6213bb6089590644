use std::{fmt, path::PathBuf};

/// Where a sound resource lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Local file, e.g. a finished recording.
    File(PathBuf),
    /// Remote URL, e.g. a reference clip.
    Remote(String),
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => f.write_str(url),
        }
    }
}

/// Initial parameters for a newly loaded sound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackParams {
    /// Start playing as soon as the sound is loaded.
    pub should_play: bool,
    /// Loop at the end of the clip.
    pub is_looping: bool,
    /// Start muted.
    pub muted: bool,
    /// Output volume in `[0, 1]`.
    pub volume: f32,
    /// Playback speed multiplier.
    pub rate: f32,
    /// Preserve pitch when the rate differs from 1.0.
    pub should_correct_pitch: bool,
}

impl Default for PlaybackParams {
    fn default() -> Self {
        Self {
            should_play: false,
            is_looping: false,
            muted: false,
            volume: 1.0,
            rate: 1.0,
            should_correct_pitch: true,
        }
    }
}

/// Capture settings handed to the recorder as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingSettings {
    /// PCM sample width written to the capture file.
    pub bits_per_sample: u16,
    /// Hardware stops the capture on its own after this long.
    pub max_duration_ms: Option<u64>,
    /// How often the recorder reports progress.
    pub status_interval_ms: u64,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            bits_per_sample: 16,
            max_duration_ms: None,
            status_interval_ms: 500,
        }
    }
}
