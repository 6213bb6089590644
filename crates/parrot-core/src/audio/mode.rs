/// How the session reacts to other apps producing audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptionMode {
    /// Other audio is interrupted while the session is active.
    DoNotMix,
    /// Other audio keeps playing at reduced volume.
    DuckOthers,
    /// Other audio keeps playing unchanged.
    MixWithOthers,
}

/// Where playback is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputRoute {
    /// Loudspeaker (default output device).
    Speaker,
    /// Handset earpiece.
    Earpiece,
}

/// Declarative configuration of the shared microphone/speaker pair.
///
/// The coordinator applies [`AudioModePolicy::recording`] before every
/// capture and [`AudioModePolicy::playback`] before every sound load. A
/// backend must refuse to prepare a capture while the active policy has
/// `allows_recording == false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioModePolicy {
    /// Whether the microphone may be opened.
    pub allows_recording: bool,
    /// Behavior towards other audio sources.
    pub interruption: InterruptionMode,
    /// Keep producing sound when the device is in silent mode.
    pub plays_in_silent_mode: bool,
    /// Keep producing sound in silent mode while the screen is locked.
    pub plays_in_silent_locked_mode: bool,
    /// Lower other apps' volume instead of pausing them.
    pub duck_others: bool,
    /// Output route for playback.
    pub route: OutputRoute,
    /// Keep the session alive while the app is in the background.
    pub stays_active_in_background: bool,
}

impl AudioModePolicy {
    /// Mode applied before preparing a microphone capture.
    pub const fn recording() -> Self {
        Self {
            allows_recording: true,
            interruption: InterruptionMode::DoNotMix,
            plays_in_silent_mode: true,
            plays_in_silent_locked_mode: false,
            duck_others: true,
            route: OutputRoute::Speaker,
            stays_active_in_background: true,
        }
    }

    /// Mode applied before loading a sound for playback.
    pub const fn playback() -> Self {
        Self {
            allows_recording: false,
            interruption: InterruptionMode::DoNotMix,
            plays_in_silent_mode: true,
            plays_in_silent_locked_mode: true,
            duck_others: true,
            route: OutputRoute::Speaker,
            stays_active_in_background: true,
        }
    }
}

impl Default for AudioModePolicy {
    fn default() -> Self {
        Self::playback()
    }
}
