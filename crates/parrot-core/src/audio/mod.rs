mod capture;
mod cpal_hardware;
mod decoder;
mod hardware;
mod mode;
mod output;
mod params;
mod playback;
mod recording;
mod resampler;
mod status;

pub(crate) use {capture::CpalRecorder, output::CpalSound, resampler::Resampler};

#[cfg(test)]
pub(crate) use {
    capture::{CaptureShared, WavFileWriter},
    output::{Player, SoundShared},
};

pub use {
    cpal_hardware::CpalHardware,
    decoder::{DecodedAudio, decode},
    hardware::{
        AudioHardware, CaptureLock, ClipFetcher, Generation, HardwareEvent, RecorderDevice,
        SoundDevice, StatusSink,
    },
    mode::{AudioModePolicy, InterruptionMode, OutputRoute},
    output::{MAX_RATE, MIN_RATE, check_rate},
    params::{Locator, PlaybackParams, RecordingSettings},
    playback::{PlaybackPhase, PlaybackSession},
    recording::{RecordingPhase, RecordingSession},
    status::{LoadedStatus, PlaybackStatus, RecordingStatus},
};
