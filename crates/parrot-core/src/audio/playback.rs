use crate::{
    AudioError, CoreResult,
    audio::{AudioHardware, Generation, Locator, PlaybackParams, SoundDevice, StatusSink},
};

use std::{io::ErrorKind, panic::Location, path::Path};

use error_location::ErrorLocation;
use tracing::{debug, info, instrument, warn};

/// Lifecycle of a loaded sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    /// Loaded, never played.
    Loaded,
    /// Producing sound.
    Playing,
    /// Paused at the current position.
    Paused,
    /// Stopped and rewound.
    Stopped,
    /// Released. Terminal.
    Unloaded,
}

/// One loaded sound resource: a finished recording or a reference clip.
pub struct PlaybackSession {
    generation: Generation,
    locator: Locator,
    device: Box<dyn SoundDevice>,
    duration_ms: Option<u64>,
    phase: PlaybackPhase,
    /// Delete the backing file on unload.
    owns_file: bool,
}

impl PlaybackSession {
    /// Open `locator` on `hardware`.
    ///
    /// # Errors
    ///
    /// `LoadError` when the resource cannot be fetched or decoded.
    #[instrument(skip(hardware, sink), fields(generation = sink.generation()))]
    pub async fn load(
        hardware: &dyn AudioHardware,
        locator: Locator,
        params: PlaybackParams,
        sink: StatusSink,
    ) -> CoreResult<Self> {
        let generation = sink.generation();
        let device = hardware.load_sound(&locator, &params, sink).await?;
        let duration_ms = device.duration_ms();

        info!(locator = %locator, generation, duration_ms = ?duration_ms, "Sound loaded");

        Ok(Self {
            generation,
            locator,
            device,
            duration_ms,
            phase: if params.should_play {
                PlaybackPhase::Playing
            } else {
                PlaybackPhase::Loaded
            },
            owns_file: false,
        })
    }

    /// Take ownership of the backing file, so unloading deletes it.
    pub(crate) fn own_file(&mut self) {
        self.owns_file = true;
    }

    /// Start or resume playback.
    pub async fn play(&mut self) -> CoreResult<()> {
        self.ensure_loaded()?;
        self.device.play().await?;
        self.phase = PlaybackPhase::Playing;
        Ok(())
    }

    /// Pause at the current position.
    pub async fn pause(&mut self) -> CoreResult<()> {
        self.ensure_loaded()?;
        self.device.pause().await?;
        if self.phase == PlaybackPhase::Playing {
            self.phase = PlaybackPhase::Paused;
        }
        Ok(())
    }

    /// Stop and rewind to 0.
    pub async fn stop(&mut self) -> CoreResult<()> {
        self.ensure_loaded()?;
        self.device.stop().await?;
        self.phase = PlaybackPhase::Stopped;
        Ok(())
    }

    /// Move the playhead, clamped to `[0, duration]`.
    pub async fn seek_to(&mut self, position_ms: i64) -> CoreResult<()> {
        self.ensure_loaded()?;
        let position = self.clamp_position(position_ms);
        self.device.set_position(position).await
    }

    /// Move the playhead, clamped to `[0, duration]`, and play from there.
    pub async fn play_from_position(&mut self, position_ms: i64) -> CoreResult<()> {
        self.ensure_loaded()?;
        let position = self.clamp_position(position_ms);
        self.device.play_from_position(position).await?;
        self.phase = PlaybackPhase::Playing;
        Ok(())
    }

    /// Set output volume, clamped to `[0, 1]`.
    pub async fn set_volume(&mut self, volume: f32) -> CoreResult<()> {
        self.ensure_loaded()?;
        self.device.set_volume(volume.clamp(0.0, 1.0)).await
    }

    /// Mute or unmute.
    pub async fn set_muted(&mut self, muted: bool) -> CoreResult<()> {
        self.ensure_loaded()?;
        self.device.set_muted(muted).await
    }

    /// Change playback speed.
    ///
    /// # Errors
    ///
    /// `UnsupportedRate` when the output cannot apply it. Callers must not
    /// assume the rate changed.
    pub async fn set_rate(&mut self, rate: f32, correct_pitch: bool) -> CoreResult<()> {
        self.ensure_loaded()?;
        self.device.set_rate(rate, correct_pitch).await
    }

    /// Release the sound. The status sink is cleared before the device is
    /// released. A finished recording is deleted from disk. Unloading twice
    /// is a no-op.
    #[instrument(skip(self), fields(generation = self.generation))]
    pub async fn unload(&mut self) -> CoreResult<()> {
        if self.phase == PlaybackPhase::Unloaded {
            return Ok(());
        }

        self.device.clear_status_sink();
        self.phase = PlaybackPhase::Unloaded;
        let result = self.device.unload().await;

        if self.owns_file {
            if let Locator::File(path) = &self.locator {
                remove_recording(path).await;
            }
        }

        debug!(locator = %self.locator, "Sound unloaded");

        result
    }

    /// Generation the status sink was stamped with.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Clip length reported at load time.
    pub fn duration_ms(&self) -> Option<u64> {
        self.duration_ms
    }

    /// Resource this sound was loaded from.
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    fn clamp_position(&self, position_ms: i64) -> u64 {
        let position = u64::try_from(position_ms).unwrap_or(0);
        match self.duration_ms {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    #[track_caller]
    fn ensure_loaded(&self) -> CoreResult<()> {
        if self.phase == PlaybackPhase::Unloaded {
            return Err(AudioError::Unloaded {
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(())
    }
}

/// Delete a superseded recording. A missing file is not an error.
pub(crate) async fn remove_recording(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = ?path, "Recording deleted"),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = ?path, "Recording already gone");
        }
        Err(e) => warn!(path = ?path, error = %e, "Failed to delete recording"),
    }
}
