/// Status reported by a microphone capture.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingStatus {
    /// Capture is prepared and may be running.
    Active {
        /// Whether samples are currently being captured.
        is_recording: bool,
        /// Captured length so far.
        duration_ms: u64,
    },
    /// Capture has ended, either on request or because the hardware stopped it.
    Finished {
        /// Final captured length.
        duration_ms: u64,
    },
}

/// Snapshot of a loaded sound.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedStatus {
    /// Clip length, when the decoder knows it.
    pub duration_ms: Option<u64>,
    /// Current playhead.
    pub position_ms: u64,
    /// Whether playback was requested.
    pub should_play: bool,
    /// Whether samples are actually being produced.
    pub is_playing: bool,
    /// Playback speed multiplier in effect.
    pub rate: f32,
    /// Whether output is muted.
    pub muted: bool,
    /// Output volume in `[0, 1]`.
    pub volume: f32,
    /// Whether rate changes preserve pitch.
    pub should_correct_pitch: bool,
    /// Set on the first status after the playhead reached the end.
    pub did_just_finish: bool,
}

/// Status reported by a sound resource.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackStatus {
    /// Sound is loaded.
    Loaded(LoadedStatus),
    /// Sound is not (or no longer) loaded.
    NotLoaded {
        /// Fatal player error, if that is why it is not loaded.
        error: Option<String>,
    },
}
