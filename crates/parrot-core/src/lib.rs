//! Parrot Core Library
//!
//! Audio session state machine for record-and-compare pronunciation
//! practice: one microphone capture or one loaded sound at a time, driven
//! by hardware statuses that may arrive late or out of order.
//!
//! # Example
//!
//! ```no_run
//! use parrot_core::{
//!     ClipFetcher, CoordinatorOptions, CoreResult, CpalHardware, SessionCoordinator,
//! };
//!
//! use std::{path::PathBuf, sync::Arc, time::Duration};
//!
//! async fn practice(fetcher: Arc<dyn ClipFetcher>) -> CoreResult<()> {
//!     let hardware = CpalHardware::new(
//!         PathBuf::from("recordings"),
//!         fetcher,
//!         Duration::from_millis(500),
//!     );
//!     let mut coordinator =
//!         SessionCoordinator::new(Arc::new(hardware), CoordinatorOptions::default());
//!
//!     coordinator.request_permissions().await;
//!     coordinator.on_record_button_pressed().await?;
//!     tokio::time::sleep(Duration::from_secs(3)).await;
//!     coordinator.on_record_button_pressed().await?;
//!     coordinator.on_play_pause_pressed().await?;
//!     Ok(())
//! }
//! ```

mod audio;
mod coordinator;
mod error;
mod sequence;
pub mod timestamp;

pub use {
    audio::{
        AudioHardware, AudioModePolicy, CaptureLock, ClipFetcher, CpalHardware, DecodedAudio,
        Generation, HardwareEvent, InterruptionMode, LoadedStatus, Locator, MAX_RATE, MIN_RATE,
        OutputRoute, PlaybackParams, PlaybackPhase, PlaybackSession, PlaybackStatus,
        RecorderDevice, RecordingPhase, RecordingSession, RecordingSettings, RecordingStatus,
        SoundDevice, StatusSink, check_rate, decode,
    },
    coordinator::{CoordinatorOptions, Phase, SessionCoordinator, SessionState},
    error::{AudioError, Result as CoreResult},
    sequence::{ClipUrlTemplate, DEFAULT_CLIP_HOST, DEFAULT_CLIP_PREFIX, SequenceNavigator},
};
