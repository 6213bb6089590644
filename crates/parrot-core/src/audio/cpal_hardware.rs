use crate::{
    AudioError, CoreResult,
    audio::{
        AudioHardware, AudioModePolicy, CaptureLock, ClipFetcher, CpalRecorder, CpalSound,
        Locator, PlaybackParams, RecorderDevice, Resampler, SoundDevice, StatusSink, decode,
    },
};

use std::{
    panic::Location,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use cpal::{
    StreamConfig,
    traits::{DeviceTrait, HostTrait},
};
use error_location::ErrorLocation;
use tracing::{debug, info, instrument, warn};

/// Desktop audio through the default cpal host.
///
/// Microphone permission is treated as granted when a default input device
/// exists. The audio mode is kept in memory and consulted by recorders.
pub struct CpalHardware {
    capture_lock: CaptureLock,
    policy: Arc<Mutex<AudioModePolicy>>,
    fetcher: Arc<dyn ClipFetcher>,
    recordings_dir: PathBuf,
    status_interval: Duration,
}

impl CpalHardware {
    /// Hardware writing captures to `recordings_dir` and fetching remote
    /// clips through `fetcher`.
    pub fn new(
        recordings_dir: PathBuf,
        fetcher: Arc<dyn ClipFetcher>,
        status_interval: Duration,
    ) -> Self {
        Self {
            capture_lock: CaptureLock::default(),
            policy: Arc::new(Mutex::new(AudioModePolicy::default())),
            fetcher,
            recordings_dir,
            status_interval,
        }
    }

    /// Audio mode most recently applied.
    pub fn audio_mode(&self) -> AudioModePolicy {
        *self.policy.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn read_locator(&self, locator: &Locator) -> CoreResult<Vec<u8>> {
        match locator {
            Locator::File(path) => {
                tokio::fs::read(path)
                    .await
                    .map_err(|e| AudioError::LoadError {
                        reason: format!("Failed to read {}: {}", path.display(), e),
                        location: ErrorLocation::from(Location::caller()),
                    })
            }
            Locator::Remote(url) => self.fetcher.fetch(url).await,
        }
    }
}

#[async_trait]
impl AudioHardware for CpalHardware {
    async fn request_recording_permission(&self) -> bool {
        let granted = cpal::default_host().default_input_device().is_some();
        if !granted {
            warn!("No input device available, recording permission denied");
        }
        granted
    }

    #[instrument(skip(self))]
    async fn set_audio_mode(&self, policy: &AudioModePolicy) -> CoreResult<()> {
        *self.policy.lock().unwrap_or_else(|e| e.into_inner()) = *policy;
        debug!(allows_recording = policy.allows_recording, "Audio mode applied");
        Ok(())
    }

    fn create_recorder(&self) -> Box<dyn RecorderDevice> {
        Box::new(CpalRecorder::new(
            self.recordings_dir.clone(),
            Arc::clone(&self.policy),
        ))
    }

    #[instrument(skip(self, params, sink), fields(locator = %locator))]
    async fn load_sound(
        &self,
        locator: &Locator,
        params: &PlaybackParams,
        sink: StatusSink,
    ) -> CoreResult<Box<dyn SoundDevice>> {
        let bytes = self.read_locator(locator).await?;
        let extension = match locator {
            Locator::File(path) => path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_string),
            Locator::Remote(url) => url.rsplit('.').next().map(str::to_string),
        };

        let decoded = tokio::task::spawn_blocking(move || decode(bytes, extension.as_deref()))
            .await
            .map_err(|e| AudioError::LoadError {
                reason: format!("Decode task failed: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })??
            .into_mono();

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::LoadError {
                reason: "No output device found".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;
        let mut config: StreamConfig = device
            .default_output_config()
            .map_err(|e| AudioError::LoadError {
                reason: format!("Failed to get output config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?
            .into();
        config.buffer_size = cpal::BufferSize::Default;

        let samples = if decoded.sample_rate == config.sample_rate {
            decoded.samples
        } else {
            Resampler::new(decoded.sample_rate, config.sample_rate, 1)
                .and_then(|mut r| r.resample(&decoded.samples))
                .map_err(|e| AudioError::LoadError {
                    reason: e.to_string(),
                    location: ErrorLocation::from(Location::caller()),
                })?
        };

        let sound = CpalSound::open(
            &device,
            &config,
            samples,
            params,
            sink,
            self.status_interval,
        )?;

        info!(
            output_rate = config.sample_rate,
            channels = config.channels,
            "Output stream opened"
        );

        Ok(Box::new(sound))
    }

    fn capture_lock(&self) -> CaptureLock {
        self.capture_lock.clone()
    }
}
