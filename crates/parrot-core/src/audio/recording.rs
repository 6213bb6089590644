use crate::{
    AudioError, CoreResult,
    audio::{
        AudioHardware, CaptureLock, Generation, Locator, PlaybackParams, PlaybackSession,
        RecorderDevice, RecordingSettings, StatusSink, playback::remove_recording,
    },
};

use std::panic::Location;

use error_location::ErrorLocation;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Lifecycle of a microphone capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingPhase {
    /// Resources allocated, not yet capturing.
    Prepared,
    /// Capturing.
    Started,
    /// Capture ended; the file is final.
    Stopped,
}

/// One prepared microphone capture.
///
/// Holds the microphone claim from `start` until `stop` (or drop). Once
/// stopped it can be turned into a [`PlaybackSession`] exactly once via
/// [`RecordingSession::into_playback`], which consumes it.
pub struct RecordingSession {
    id: Uuid,
    generation: Generation,
    device: Box<dyn RecorderDevice>,
    capture_lock: CaptureLock,
    holds_capture: bool,
    phase: RecordingPhase,
}

impl RecordingSession {
    /// Create a recorder on `hardware` and prepare it.
    #[instrument(skip(hardware, sink), fields(generation = sink.generation()))]
    pub async fn prepare(
        hardware: &dyn AudioHardware,
        settings: &RecordingSettings,
        sink: StatusSink,
    ) -> CoreResult<Self> {
        let generation = sink.generation();
        let mut device = hardware.create_recorder();
        device.prepare(settings, sink).await?;

        let id = Uuid::new_v4();
        debug!(recording_id = %id, generation, "Recording prepared");

        Ok(Self {
            id,
            generation,
            device,
            capture_lock: hardware.capture_lock(),
            holds_capture: false,
            phase: RecordingPhase::Prepared,
        })
    }

    /// Begin capturing.
    ///
    /// # Errors
    ///
    /// `HardwareBusy` if another capture holds the microphone, `NotReady`
    /// if this capture was already stopped.
    #[instrument(skip(self), fields(recording_id = %self.id))]
    pub async fn start(&mut self) -> CoreResult<()> {
        match self.phase {
            RecordingPhase::Started => return Ok(()),
            RecordingPhase::Stopped => {
                return Err(AudioError::NotReady {
                    reason: "capture already stopped".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            RecordingPhase::Prepared => {}
        }

        if !self.capture_lock.try_acquire() {
            return Err(AudioError::HardwareBusy {
                location: ErrorLocation::from(Location::caller()),
            });
        }
        self.holds_capture = true;

        if let Err(e) = self.device.start().await {
            self.release_capture();
            return Err(e);
        }

        self.phase = RecordingPhase::Started;
        info!(recording_id = %self.id, "Recording started");

        Ok(())
    }

    /// Stop capturing. A second call, or a call after the hardware stopped
    /// on its own, is a no-op.
    #[instrument(skip(self), fields(recording_id = %self.id))]
    pub async fn stop(&mut self) {
        if self.phase == RecordingPhase::Stopped {
            return;
        }

        if let Err(e) = self.device.stop().await {
            // Hardware already finalized the capture (e.g. length limit reached).
            debug!(error = ?e, "Recorder stop failed, treating as already stopped");
        }

        self.phase = RecordingPhase::Stopped;
        self.release_capture();
        info!(recording_id = %self.id, "Recording stopped");
    }

    /// Locator of the captured file.
    ///
    /// # Errors
    ///
    /// `NotReady` until the capture is stopped.
    #[track_caller]
    pub fn locator(&self) -> CoreResult<Locator> {
        if self.phase != RecordingPhase::Stopped {
            return Err(AudioError::NotReady {
                reason: format!("capture is {:?}", self.phase),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        self.device
            .output_path()
            .map(Locator::File)
            .ok_or_else(|| AudioError::NotReady {
                reason: "recorder produced no file".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    /// Load the captured file as a new sound that owns the file.
    ///
    /// The recorder's status sink is cleared first, so no capture status is
    /// delivered after this point. If loading fails the file is deleted.
    #[instrument(skip(self, hardware, sink), fields(recording_id = %self.id))]
    pub async fn into_playback(
        mut self,
        hardware: &dyn AudioHardware,
        params: PlaybackParams,
        sink: StatusSink,
    ) -> CoreResult<PlaybackSession> {
        let locator = self.locator()?;
        self.discard();

        if let Locator::File(path) = &locator {
            match tokio::fs::metadata(path).await {
                Ok(meta) => info!(path = ?path, size_bytes = meta.len(), "Recorded file info"),
                Err(e) => warn!(path = ?path, error = %e, "Recorded file info unavailable"),
            }
        }

        match PlaybackSession::load(hardware, locator.clone(), params, sink).await {
            Ok(mut playback) => {
                playback.own_file();
                Ok(playback)
            }
            Err(e) => {
                if let Locator::File(path) = &locator {
                    remove_recording(path).await;
                }
                Err(e)
            }
        }
    }

    /// Deregister the status sink. Call before dropping the session.
    pub fn discard(&mut self) {
        self.device.clear_status_sink();
    }

    /// Generation the status sink was stamped with.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> RecordingPhase {
        self.phase
    }

    fn release_capture(&mut self) {
        if self.holds_capture {
            self.capture_lock.release();
            self.holds_capture = false;
        }
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        self.release_capture();
    }
}
