use crate::{
    audio::PlaybackParams,
    timestamp::{format_mmss, format_progress},
};

/// Which commands the coordinator accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing loaded.
    #[default]
    Idle,
    /// A capture is running.
    Recording,
    /// The capture is being finalized and loaded back for playback.
    StoppingRecording,
    /// A sound is loaded.
    PlaybackLoaded,
    /// The loaded sound is being released.
    Unloading,
}

/// Application-visible snapshot of the audio session.
///
/// Hardware handles are owned by the coordinator and never appear here.
/// Playback fields mirror the last values confirmed by a hardware status.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    /// Current lifecycle phase.
    pub phase: Phase,
    /// An async hardware operation is in flight.
    pub is_loading: bool,
    /// Microphone permission was granted.
    pub has_recording_permission: bool,
    /// The recorder reports it is capturing.
    pub is_recording: bool,
    /// Captured length reported by the recorder.
    pub recording_duration_ms: Option<u64>,
    /// A loaded sound reported itself playable.
    pub is_playback_allowed: bool,
    /// Playhead of the loaded sound.
    pub sound_position_ms: Option<u64>,
    /// Length of the loaded sound.
    pub sound_duration_ms: Option<u64>,
    /// Playback was requested.
    pub should_play: bool,
    /// Sound is audibly playing.
    pub is_playing: bool,
    /// Output is muted.
    pub muted: bool,
    /// Output volume in `[0, 1]`.
    pub volume: f32,
    /// Playback speed multiplier.
    pub rate: f32,
    /// Rate changes preserve pitch.
    pub should_correct_pitch: bool,
    /// A seek gesture is in progress.
    pub is_seek_pending: bool,
    /// Playback resumes when the seek is committed.
    pub pending_resume_on_seek_end: bool,
    /// Last error carried by a hardware status.
    pub last_error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        let params = PlaybackParams::default();
        Self {
            phase: Phase::Idle,
            is_loading: false,
            has_recording_permission: false,
            is_recording: false,
            recording_duration_ms: None,
            is_playback_allowed: false,
            sound_position_ms: None,
            sound_duration_ms: None,
            should_play: false,
            is_playing: false,
            muted: params.muted,
            volume: params.volume,
            rate: params.rate,
            should_correct_pitch: params.should_correct_pitch,
            is_seek_pending: false,
            pending_resume_on_seek_end: false,
            last_error: None,
        }
    }
}

impl SessionState {
    /// Whether the record button is usable.
    pub fn recording_controls_enabled(&self) -> bool {
        self.has_recording_permission && !self.is_loading
    }

    /// Whether play/pause, stop, seek, mute, volume and rate are usable.
    pub fn playback_controls_enabled(&self) -> bool {
        self.is_playback_allowed && !self.is_loading
    }

    /// Seek slider position in `[0, 1]`; 0 when the clip length is unknown.
    pub fn seek_slider_position(&self) -> f64 {
        match (self.sound_position_ms, self.sound_duration_ms) {
            (Some(position), Some(duration)) if duration > 0 => {
                (position as f64 / duration as f64).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }

    /// `MM:SS / MM:SS`, or empty while position or length is unknown.
    pub fn playback_timestamp(&self) -> String {
        format_progress(self.sound_position_ms, self.sound_duration_ms)
    }

    /// Captured length as `MM:SS`.
    pub fn recording_timestamp(&self) -> String {
        format_mmss(self.recording_duration_ms.unwrap_or(0))
    }

    /// Parameters for the next sound, carried over from the current ones.
    pub fn playback_params(&self, should_play: bool) -> PlaybackParams {
        PlaybackParams {
            should_play,
            is_looping: false,
            muted: self.muted,
            volume: self.volume,
            rate: self.rate,
            should_correct_pitch: self.should_correct_pitch,
        }
    }

    pub(crate) fn clear_sound(&mut self) {
        self.is_playback_allowed = false;
        self.sound_position_ms = None;
        self.sound_duration_ms = None;
        self.should_play = false;
        self.is_playing = false;
        self.is_seek_pending = false;
        self.pending_resume_on_seek_end = false;
    }
}
