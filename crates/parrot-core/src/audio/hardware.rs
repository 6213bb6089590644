//! Seams between the session state machine and the platform audio stack.
//!
//! Hardware never calls back into the coordinator directly. Every handle is
//! given a [`StatusSink`] stamped with a generation number, and statuses
//! travel as [`HardwareEvent`]s over a channel the coordinator drains on its
//! own task. A status whose generation no longer matches the coordinator's
//! current handle is dropped there.

use crate::{
    CoreResult,
    audio::{AudioModePolicy, Locator, PlaybackParams, PlaybackStatus, RecordingSettings, RecordingStatus},
};

use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Identity of one recording or playback handle.
pub type Generation = u64;

/// Status delivered by the hardware for a specific handle.
#[derive(Debug, Clone, PartialEq)]
pub enum HardwareEvent {
    /// Status of a microphone capture.
    Recording {
        /// Handle the status belongs to.
        generation: Generation,
        /// Reported status.
        status: RecordingStatus,
    },
    /// Status of a sound resource.
    Playback {
        /// Handle the status belongs to.
        generation: Generation,
        /// Reported status.
        status: PlaybackStatus,
    },
}

/// Sending half of the status channel, bound to one handle.
///
/// Safe to use from audio callback threads; sending never blocks. Sends
/// after the coordinator is gone are dropped.
#[derive(Debug, Clone)]
pub struct StatusSink {
    generation: Generation,
    tx: mpsc::UnboundedSender<HardwareEvent>,
}

impl StatusSink {
    pub(crate) fn new(generation: Generation, tx: mpsc::UnboundedSender<HardwareEvent>) -> Self {
        Self { generation, tx }
    }

    /// Generation of the handle this sink reports for.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Report a recording status.
    pub fn recording(&self, status: RecordingStatus) {
        let _ = self.tx.send(HardwareEvent::Recording {
            generation: self.generation,
            status,
        });
    }

    /// Report a playback status.
    pub fn playback(&self, status: PlaybackStatus) {
        let _ = self.tx.send(HardwareEvent::Playback {
            generation: self.generation,
            status,
        });
    }
}

/// Exclusive claim on the microphone, shared by every recorder of one
/// hardware instance.
#[derive(Debug, Clone, Default)]
pub struct CaptureLock(Arc<AtomicBool>);

impl CaptureLock {
    /// Claim the microphone. Returns `false` if it is already held.
    pub fn try_acquire(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Give the microphone back.
    pub fn release(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Whether a capture currently holds the microphone.
    pub fn is_held(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Platform audio subsystem: one microphone, one output, one mode setting.
#[async_trait]
pub trait AudioHardware: Send + Sync {
    /// Ask for microphone permission. Returns whether it was granted.
    async fn request_recording_permission(&self) -> bool;

    /// Reconfigure the shared device pair.
    async fn set_audio_mode(&self, policy: &AudioModePolicy) -> CoreResult<()>;

    /// Create an unprepared recorder.
    fn create_recorder(&self) -> Box<dyn RecorderDevice>;

    /// Open a sound resource. Resolves once its duration is known.
    async fn load_sound(
        &self,
        locator: &Locator,
        params: &PlaybackParams,
        sink: StatusSink,
    ) -> CoreResult<Box<dyn SoundDevice>>;

    /// Microphone claim shared by all recorders of this hardware.
    fn capture_lock(&self) -> CaptureLock;
}

/// One microphone capture.
#[async_trait]
pub trait RecorderDevice: Send {
    /// Allocate capture resources and register the status sink.
    async fn prepare(&mut self, settings: &RecordingSettings, sink: StatusSink) -> CoreResult<()>;

    /// Begin capturing.
    async fn start(&mut self) -> CoreResult<()>;

    /// Stop capturing and finalize the file. May fail if the hardware
    /// already stopped on its own.
    async fn stop(&mut self) -> CoreResult<()>;

    /// File the capture is written to, once prepared.
    fn output_path(&self) -> Option<PathBuf>;

    /// Stop delivering statuses.
    fn clear_status_sink(&mut self);
}

/// One loaded sound resource.
#[async_trait]
pub trait SoundDevice: Send {
    /// Clip length, when known.
    fn duration_ms(&self) -> Option<u64>;

    /// Start or resume playback.
    async fn play(&mut self) -> CoreResult<()>;

    /// Pause, keeping the position.
    async fn pause(&mut self) -> CoreResult<()>;

    /// Stop and rewind to 0.
    async fn stop(&mut self) -> CoreResult<()>;

    /// Move the playhead without changing play state.
    async fn set_position(&mut self, position_ms: u64) -> CoreResult<()>;

    /// Move the playhead and start playing.
    async fn play_from_position(&mut self, position_ms: u64) -> CoreResult<()>;

    /// Set output volume in `[0, 1]`.
    async fn set_volume(&mut self, volume: f32) -> CoreResult<()>;

    /// Mute or unmute output.
    async fn set_muted(&mut self, muted: bool) -> CoreResult<()>;

    /// Change playback speed. May fail with `UnsupportedRate`.
    async fn set_rate(&mut self, rate: f32, correct_pitch: bool) -> CoreResult<()>;

    /// Release the resource.
    async fn unload(&mut self) -> CoreResult<()>;

    /// Stop delivering statuses.
    fn clear_status_sink(&mut self);
}

/// Downloads remote clips.
#[async_trait]
pub trait ClipFetcher: Send + Sync {
    /// Fetch the encoded bytes behind `url`.
    async fn fetch(&self, url: &str) -> CoreResult<Vec<u8>>;
}
