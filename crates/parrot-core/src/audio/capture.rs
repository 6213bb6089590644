use crate::{
    AudioError, CoreResult,
    audio::{AudioModePolicy, RecorderDevice, RecordingSettings, RecordingStatus, StatusSink},
};

use std::{
    fs::File,
    io::BufWriter,
    panic::Location,
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use cpal::{
    Stream, StreamConfig,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use error_location::ErrorLocation;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

pub(crate) type WavFileWriter = hound::WavWriter<BufWriter<File>>;

/// State shared between the cpal input callback, the status ticker and
/// the recorder itself.
pub(crate) struct CaptureShared {
    writer: Mutex<Option<WavFileWriter>>,
    sink: Mutex<Option<StatusSink>>,
    frames_written: AtomicU64,
    /// Set once the length limit is hit; the callback stops writing.
    limit_reached: AtomicBool,
    /// Set by `stop()` before the stream is dropped.
    shutdown: AtomicBool,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
    max_frames: Option<u64>,
}

impl CaptureShared {
    pub(crate) fn new(
        writer: WavFileWriter,
        sink: StatusSink,
        channels: u16,
        sample_rate: u32,
        bits_per_sample: u16,
        max_frames: Option<u64>,
    ) -> Self {
        Self {
            writer: Mutex::new(Some(writer)),
            sink: Mutex::new(Some(sink)),
            frames_written: AtomicU64::new(0),
            limit_reached: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            channels,
            sample_rate,
            bits_per_sample,
            max_frames,
        }
    }

    pub(crate) fn frames_written(&self) -> u64 {
        self.frames_written.load(Ordering::Acquire)
    }

    pub(crate) fn limit_reached(&self) -> bool {
        self.limit_reached.load(Ordering::Acquire)
    }

    fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    pub(crate) fn duration_ms(&self) -> u64 {
        self.frames_written() * 1000 / u64::from(self.sample_rate.max(1))
    }

    fn report(&self, status: RecordingStatus) {
        let sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(sink) = sink.as_ref() {
            sink.recording(status);
        }
    }

    /// Finalize the WAV file. Returns `false` if it was already finalized.
    pub(crate) fn finalize(&self) -> CoreResult<bool> {
        let writer = self.writer.lock().unwrap_or_else(|e| e.into_inner()).take();
        match writer {
            Some(writer) => {
                writer.finalize().map_err(|e| AudioError::DeviceError {
                    reason: format!("Failed to finalize capture file: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Append interleaved samples, stopping at the length limit.
    pub(crate) fn write(&self, data: &[f32]) {
        let mut guard = self.writer.lock().unwrap_or_else(|e| {
            error!("Capture writer lock poisoned, recovering: {}", e);
            e.into_inner()
        });
        let Some(writer) = guard.as_mut() else {
            return;
        };

        let channels = usize::from(self.channels.max(1));
        let mut frames = 0u64;
        for frame in data.chunks_exact(channels) {
            let written = self.frames_written() + frames;
            if self.max_frames.is_some_and(|max| written >= max) {
                self.limit_reached.store(true, Ordering::Release);
                break;
            }
            for &sample in frame {
                let result = if self.bits_per_sample == 32 {
                    writer.write_sample(sample)
                } else {
                    writer.write_sample((sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16)
                };
                if let Err(e) = result {
                    error!("Failed to write captured sample: {}", e);
                    return;
                }
            }
            frames += 1;
        }
        self.frames_written.fetch_add(frames, Ordering::AcqRel);
    }
}

/// Microphone capture on the default cpal input device, written to a WAV
/// file.
pub struct CpalRecorder {
    output_dir: PathBuf,
    policy: Arc<Mutex<AudioModePolicy>>,
    path: Option<PathBuf>,
    stream: Option<Stream>,
    shared: Option<Arc<CaptureShared>>,
    ticker: Option<JoinHandle<()>>,
    status_interval: Duration,
}

impl CpalRecorder {
    /// Recorder writing into `output_dir`, honoring the shared audio mode.
    pub fn new(output_dir: PathBuf, policy: Arc<Mutex<AudioModePolicy>>) -> Self {
        Self {
            output_dir,
            policy,
            path: None,
            stream: None,
            shared: None,
            ticker: None,
            status_interval: Duration::from_millis(500),
        }
    }

    fn spawn_ticker(&mut self, shared: Arc<CaptureShared>) {
        let interval = self.status_interval;
        self.ticker = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if shared.is_shut_down() {
                    break;
                }
                if shared.limit_reached() {
                    match shared.finalize() {
                        Ok(_) => info!("Capture length limit reached, recording finished"),
                        Err(e) => error!(error = ?e, "Failed to finalize capture at limit"),
                    }
                    shared.report(RecordingStatus::Finished {
                        duration_ms: shared.duration_ms(),
                    });
                    break;
                }
                shared.report(RecordingStatus::Active {
                    is_recording: true,
                    duration_ms: shared.duration_ms(),
                });
            }
        }));
    }
}

#[async_trait]
impl RecorderDevice for CpalRecorder {
    #[instrument(skip(self, sink))]
    async fn prepare(&mut self, settings: &RecordingSettings, sink: StatusSink) -> CoreResult<()> {
        let allows_recording = self
            .policy
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .allows_recording;
        if !allows_recording {
            return Err(AudioError::DeviceError {
                reason: "Audio mode does not allow recording".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(AudioError::NoMicrophoneFound {
                location: ErrorLocation::from(Location::caller()),
            })?;
        let supported = device
            .default_input_config()
            .map_err(|e| AudioError::DeviceError {
                reason: format!("Failed to get input config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;
        let config: StreamConfig = supported.into();

        let bits_per_sample = if settings.bits_per_sample == 32 { 32 } else { 16 };
        let spec = hound::WavSpec {
            channels: config.channels,
            sample_rate: config.sample_rate,
            bits_per_sample,
            sample_format: if bits_per_sample == 32 {
                hound::SampleFormat::Float
            } else {
                hound::SampleFormat::Int
            },
        };

        std::fs::create_dir_all(&self.output_dir).map_err(|e| AudioError::DeviceError {
            reason: format!("Failed to create recordings directory: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;
        let path = self
            .output_dir
            .join(format!("recording-{}.wav", Uuid::new_v4()));
        let writer = hound::WavWriter::create(&path, spec).map_err(|e| AudioError::DeviceError {
            reason: format!("Failed to create capture file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let max_frames = settings
            .max_duration_ms
            .map(|ms| ms * u64::from(config.sample_rate) / 1000);

        let shared = Arc::new(CaptureShared::new(
            writer,
            sink,
            config.channels,
            config.sample_rate,
            bits_per_sample,
            max_frames,
        ));

        let callback_shared = Arc::clone(&shared);
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if callback_shared.is_shut_down() || callback_shared.limit_reached() {
                        return;
                    }
                    callback_shared.write(data);
                },
                |err| {
                    error!("Audio input stream error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioError::DeviceError {
                reason: format!("Failed to build input stream: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!(
            path = ?path,
            sample_rate = config.sample_rate,
            channels = config.channels,
            bits_per_sample,
            "Capture prepared"
        );

        shared.report(RecordingStatus::Active {
            is_recording: false,
            duration_ms: 0,
        });

        self.status_interval = Duration::from_millis(settings.status_interval_ms.max(1));
        self.path = Some(path);
        self.stream = Some(stream);
        self.shared = Some(shared);

        Ok(())
    }

    #[instrument(skip(self))]
    async fn start(&mut self) -> CoreResult<()> {
        let (Some(stream), Some(shared)) = (self.stream.as_ref(), self.shared.clone()) else {
            return Err(AudioError::NotReady {
                reason: "capture was not prepared".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        };

        stream.play().map_err(|e| AudioError::DeviceError {
            reason: format!("Failed to start input stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        shared.report(RecordingStatus::Active {
            is_recording: true,
            duration_ms: 0,
        });
        self.spawn_ticker(shared);

        info!("Audio capture started");

        Ok(())
    }

    #[instrument(skip(self))]
    async fn stop(&mut self) -> CoreResult<()> {
        let Some(shared) = self.shared.clone() else {
            return Err(AudioError::NotReady {
                reason: "capture was not prepared".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        };

        // Flag first so an in-flight callback returns before touching the writer.
        shared.shutdown.store(true, Ordering::Release);
        if let Some(stream) = self.stream.take() {
            drop(stream);
        }
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }

        if !shared.finalize()? {
            return Err(AudioError::DeviceError {
                reason: "Capture already finalized by the hardware".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let duration_ms = shared.duration_ms();
        shared.report(RecordingStatus::Finished { duration_ms });
        debug!(duration_ms, "Audio capture stopped");

        Ok(())
    }

    fn output_path(&self) -> Option<PathBuf> {
        self.path.clone()
    }

    fn clear_status_sink(&mut self) {
        if let Some(shared) = self.shared.as_ref() {
            shared.sink.lock().unwrap_or_else(|e| e.into_inner()).take();
        }
    }
}

impl Drop for CpalRecorder {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        if let Some(shared) = self.shared.as_ref() {
            shared.shutdown.store(true, Ordering::Release);
        }
    }
}
