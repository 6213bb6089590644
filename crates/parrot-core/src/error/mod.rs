use crate::Phase;

use error_location::ErrorLocation;
use thiserror::Error;

/// Audio session errors with source location tracking.
#[derive(Error, Debug)]
pub enum AudioError {
    /// Another capture already holds the microphone.
    #[error("Audio hardware busy: another capture is active {location}")]
    HardwareBusy {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Recording has not reached the state the operation needs.
    #[error("Recording not ready: {reason} {location}")]
    NotReady {
        /// What the recording was missing.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Sound resource could not be opened (network, decode or device failure).
    #[error("Failed to load sound: {reason} {location}")]
    LoadError {
        /// Description of the load failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Output cannot apply the requested playback rate.
    #[error("Unsupported playback rate {rate} (correct pitch: {correct_pitch}): {reason} {location}")]
    UnsupportedRate {
        /// Requested rate multiplier.
        rate: f32,
        /// Whether pitch correction was requested.
        correct_pitch: bool,
        /// Why the output refused the rate.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Microphone capture permission was not granted.
    #[error("Microphone permission not granted {location}")]
    PermissionDenied {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Hardware reported an error inside a status payload.
    #[error("Hardware status error: {message} {location}")]
    StatusError {
        /// Error text carried by the status payload.
        message: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Command is not accepted in the current session phase.
    #[error("Cannot {operation} while {phase:?} {location}")]
    InvalidPhase {
        /// Name of the rejected operation.
        operation: &'static str,
        /// Phase the coordinator was in.
        phase: Phase,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// No audio input device found.
    #[error("No microphone found {location}")]
    NoMicrophoneFound {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Audio device operation failed.
    #[error("Audio device error: {reason} {location}")]
    DeviceError {
        /// Description of the device error.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Audio resampling failed.
    #[error("Resampling error: {reason} {location}")]
    ResamplingError {
        /// Description of the resampling error.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Operation issued on a sound that has already been unloaded.
    #[error("Sound has been unloaded {location}")]
    Unloaded {
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

/// Result type alias using [`AudioError`].
pub type Result<T> = std::result::Result<T, AudioError>;
