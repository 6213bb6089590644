/// Commands sent from the input handler to the main application.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Start recording, or stop and load the recording for playback.
    Record,
    /// Toggle play/pause of the loaded sound.
    PlayPause,
    /// Stop and rewind the loaded sound.
    Stop,
    /// Toggle mute.
    Mute,
    /// Set volume in `[0, 1]`.
    Volume(f32),
    /// Set the rate slider in `[0, 1]`; scaled before it reaches the sound.
    Rate(f32),
    /// Toggle pitch correction.
    Pitch,
    /// Seek to a fraction of the clip in `[0, 1]`.
    Seek(f64),
    /// Play the reference clip at the current index.
    PlayCurrent,
    /// Step to the next reference clip and play it.
    Next,
    /// Step to the previous reference clip and play it.
    Previous,
    /// Print the full session status.
    Status,
    /// Print the command list.
    Help,
    /// Request application shutdown.
    Shutdown,
}

impl AppCommand {
    /// Whether the command touches audio hardware.
    pub fn needs_audio(&self) -> bool {
        !matches!(self, Self::Status | Self::Help | Self::Shutdown)
    }
}
