//! One-line text rendering of the session snapshot.

use parrot_core::{Phase, SessionState};

/// Shown in place of all controls when microphone permission is denied.
pub const PERMISSION_DENIED_MESSAGE: &str = "Microphone permission was not granted. \
Recording and playback are disabled; grant access to an input device and restart parrot.";

/// Printed by `help`.
pub const HELP_TEXT: &str = "\
Commands:
  record          start recording, or stop and load it for playback
  play | pause    toggle playback of the loaded sound
  stop            stop and rewind
  mute            toggle mute
  volume <0..1>   set volume
  rate <0..1>     set playback speed (slider, scaled)
  pitch           toggle pitch correction
  seek <0..1>     jump to a fraction of the clip
  current         play the current reference clip
  next | prev     step through reference clips and play
  status          print the full status
  help            print this list
  quit            exit";

/// Prints the status line when it changes.
#[derive(Debug, Default)]
pub struct StatusView {
    last_line: Option<String>,
}

impl StatusView {
    /// View that has printed nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Render `state` for clip `clip_index`.
    pub fn render(state: &SessionState, clip_index: u32) -> String {
        let mut parts = vec![format!("[{}]", phase_label(state.phase))];

        if state.is_loading {
            parts.push("loading".to_string());
        }
        if state.is_recording || state.phase == Phase::Recording {
            parts.push(format!("REC {}", state.recording_timestamp()));
        }
        if state.is_playback_allowed {
            let timestamp = state.playback_timestamp();
            if !timestamp.is_empty() {
                parts.push(timestamp);
            }
            parts.push(if state.is_playing { "playing" } else { "paused" }.to_string());
            parts.push(format!("vol {:.2}", state.volume));
            parts.push(format!("rate {:.2}x", state.rate));
            parts.push(format!(
                "pitch {}",
                if state.should_correct_pitch { "on" } else { "off" }
            ));
            if state.muted {
                parts.push("muted".to_string());
            }
        }
        parts.push(format!("clip {:02}", clip_index));
        if let Some(error) = &state.last_error {
            parts.push(format!("error: {}", error));
        }

        parts.join(" | ")
    }

    /// Rendered line if it differs from the last one returned.
    pub fn refresh(&mut self, state: &SessionState, clip_index: u32) -> Option<String> {
        let line = Self::render(state, clip_index);
        if self.last_line.as_deref() == Some(line.as_str()) {
            return None;
        }
        self.last_line = Some(line.clone());
        Some(line)
    }

    /// Multi-line description for `status`.
    pub fn describe(state: &SessionState, clip_index: u32) -> String {
        format!(
            "phase: {:?}\nloading: {}\npermission: {}\nrecording: {} ({})\n\
             playback allowed: {}\nposition: {}\nslider: {:.2}\n\
             volume: {:.2} muted: {}\nrate: {:.2} pitch correction: {}\nclip: {:02}",
            state.phase,
            state.is_loading,
            state.has_recording_permission,
            state.is_recording,
            state.recording_timestamp(),
            state.is_playback_allowed,
            state.playback_timestamp(),
            state.seek_slider_position(),
            state.volume,
            state.muted,
            state.rate,
            state.should_correct_pitch,
            clip_index,
        )
    }
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Idle => "idle",
        Phase::Recording => "recording",
        Phase::StoppingRecording => "finishing",
        Phase::PlaybackLoaded => "ready",
        Phase::Unloading => "unloading",
    }
}
