use crate::{
    AudioError, CoreResult,
    audio::{LoadedStatus, PlaybackParams, PlaybackStatus, SoundDevice, StatusSink},
};

use std::{
    panic::Location,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use cpal::{
    Device, Stream, StreamConfig,
    traits::{DeviceTrait, StreamTrait},
};
use error_location::ErrorLocation;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};

/// Slowest rate the output accepts.
pub const MIN_RATE: f32 = 0.1;
/// Fastest rate the output accepts.
pub const MAX_RATE: f32 = 3.0;

/// Length of one time-stretch grain.
const GRAIN_MS: u64 = 40;

/// One overlap-add grain: reads forward at unit speed from `start`.
#[derive(Debug, Clone, Copy, Default)]
struct Grain {
    start: f64,
    offset: usize,
}

/// Playhead and parameters, shared with the cpal output callback.
///
/// Without pitch correction the rate steps through the samples faster or
/// slower, so pitch follows the rate. With pitch correction two half-offset
/// grains read at unit speed and are re-anchored at the playhead when they
/// run out, which stretches time and keeps the pitch.
pub(crate) struct Player {
    /// Mono samples at the device sample rate.
    samples: Vec<f32>,
    /// Fractional read position in frames.
    cursor: f64,
    sample_rate: u32,
    should_play: bool,
    is_looping: bool,
    muted: bool,
    volume: f32,
    rate: f32,
    should_correct_pitch: bool,
    just_finished: bool,
    grain_len: usize,
    grains: [Grain; 2],
}

impl Player {
    pub(crate) fn new(samples: Vec<f32>, sample_rate: u32, params: &PlaybackParams) -> Self {
        let grain_len = (u64::from(sample_rate) * GRAIN_MS / 1000).max(2) as usize;
        let mut player = Self {
            samples,
            cursor: 0.0,
            sample_rate,
            should_play: params.should_play,
            is_looping: params.is_looping,
            muted: params.muted,
            volume: params.volume.clamp(0.0, 1.0),
            rate: params.rate,
            should_correct_pitch: params.should_correct_pitch,
            just_finished: false,
            grain_len,
            grains: [Grain::default(); 2],
        };
        player.reset_grains();
        player
    }

    pub(crate) fn duration_ms(&self) -> u64 {
        self.samples.len() as u64 * 1000 / u64::from(self.sample_rate.max(1))
    }

    fn position_ms(&self) -> u64 {
        (self.cursor * 1000.0 / f64::from(self.sample_rate.max(1))) as u64
    }

    fn at_end(&self) -> bool {
        self.cursor as usize >= self.samples.len()
    }

    /// Start playing, rewinding first if the clip already ended.
    pub(crate) fn play(&mut self) {
        if self.at_end() {
            self.move_to(0.0);
        }
        self.should_play = true;
    }

    pub(crate) fn pause(&mut self) {
        self.should_play = false;
    }

    pub(crate) fn stop(&mut self) {
        self.should_play = false;
        self.move_to(0.0);
    }

    /// Move the playhead, clamped to the clip length.
    pub(crate) fn seek(&mut self, position_ms: u64) {
        let frame = position_ms.min(self.duration_ms()) * u64::from(self.sample_rate) / 1000;
        self.move_to(frame as f64);
    }

    pub(crate) fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub(crate) fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub(crate) fn set_rate(&mut self, rate: f32, correct_pitch: bool) {
        self.rate = rate;
        self.should_correct_pitch = correct_pitch;
        self.reset_grains();
    }

    /// Produce the next output sample and advance the playhead.
    pub(crate) fn next_sample(&mut self) -> f32 {
        if !self.should_play || self.samples.is_empty() {
            return 0.0;
        }

        if self.at_end() {
            if self.is_looping {
                self.move_to(0.0);
            } else {
                self.cursor = self.samples.len() as f64;
                self.should_play = false;
                self.just_finished = true;
            }
            return 0.0;
        }

        let sample = if self.is_stretching() {
            self.stretched_sample()
        } else {
            self.samples[self.cursor as usize]
        };
        self.cursor += f64::from(self.rate);

        let gain = if self.muted { 0.0 } else { self.volume };
        sample * gain
    }

    /// Snapshot for the status sink. Reports the end of the clip once.
    pub(crate) fn status(&mut self) -> LoadedStatus {
        let did_just_finish = std::mem::take(&mut self.just_finished);
        LoadedStatus {
            duration_ms: Some(self.duration_ms()),
            position_ms: self.position_ms(),
            should_play: self.should_play,
            is_playing: self.should_play && !self.at_end(),
            rate: self.rate,
            muted: self.muted,
            volume: self.volume,
            should_correct_pitch: self.should_correct_pitch,
            did_just_finish,
        }
    }

    fn is_stretching(&self) -> bool {
        self.should_correct_pitch && (self.rate - 1.0).abs() > f32::EPSILON
    }

    fn move_to(&mut self, frame: f64) {
        self.cursor = frame;
        self.reset_grains();
    }

    fn reset_grains(&mut self) {
        let half = self.grain_len / 2;
        self.grains = [
            Grain {
                start: self.cursor,
                offset: 0,
            },
            Grain {
                start: self.cursor - half as f64,
                offset: half,
            },
        ];
    }

    fn stretched_sample(&mut self) -> f32 {
        let cursor = self.cursor;
        let len = self.grain_len;
        let mut out = 0.0;

        for grain in self.grains.iter_mut() {
            if grain.offset >= len {
                *grain = Grain {
                    start: cursor,
                    offset: 0,
                };
            }
            // Triangular windows at half offset sum to one.
            let weight = 1.0 - (2.0 * grain.offset as f32 / len as f32 - 1.0).abs();
            let position = grain.start + grain.offset as f64;
            let sample = if position < 0.0 {
                0.0
            } else {
                self.samples.get(position as usize).copied().unwrap_or(0.0)
            };
            out += sample * weight;
            grain.offset += 1;
        }

        out
    }
}

/// Player state plus the sink it reports to.
pub(crate) struct SoundShared {
    player: Mutex<Player>,
    sink: Mutex<Option<StatusSink>>,
    /// Set once the output stream failed; nothing is reported afterwards.
    failed: AtomicBool,
}

impl SoundShared {
    pub(crate) fn new(player: Player, sink: StatusSink) -> Self {
        Self {
            player: Mutex::new(player),
            sink: Mutex::new(Some(sink)),
            failed: AtomicBool::new(false),
        }
    }

    pub(crate) fn player(&self) -> MutexGuard<'_, Player> {
        self.player.lock().unwrap_or_else(|e| {
            error!("Player lock poisoned, recovering: {}", e);
            e.into_inner()
        })
    }

    pub(crate) fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// Send the current status, unless the sound has failed.
    pub(crate) fn report(&self) {
        if self.has_failed() {
            return;
        }
        let status = self.player().status();
        if let Some(sink) = self.sink.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            sink.playback(PlaybackStatus::Loaded(status));
        }
    }

    /// Mark the sound as failed and report it as no longer loaded. Only the
    /// first failure is reported.
    pub(crate) fn fail(&self, message: String) {
        if self.failed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.player().pause();
        if let Some(sink) = self.sink.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            sink.playback(PlaybackStatus::NotLoaded {
                error: Some(message),
            });
        }
    }

    fn clear_sink(&self) {
        self.sink.lock().unwrap_or_else(|e| e.into_inner()).take();
    }
}

/// A decoded clip playing through a cpal output stream.
///
/// A stream error is reported once as `NotLoaded` with the error message and
/// stops the status ticker.
pub struct CpalSound {
    shared: Arc<SoundShared>,
    stream: Option<Stream>,
    ticker: Option<JoinHandle<()>>,
    duration_ms: u64,
}

impl CpalSound {
    /// Start an output stream on `device` for mono `samples` already at the
    /// device sample rate.
    #[track_caller]
    #[instrument(skip(device, samples, sink), fields(len = samples.len()))]
    pub fn open(
        device: &Device,
        config: &StreamConfig,
        samples: Vec<f32>,
        params: &PlaybackParams,
        sink: StatusSink,
        status_interval: Duration,
    ) -> CoreResult<Self> {
        let shared = Arc::new(SoundShared::new(
            Player::new(samples, config.sample_rate, params),
            sink,
        ));

        let channels = usize::from(config.channels.max(1));
        let callback_shared = Arc::clone(&shared);
        let error_shared = Arc::clone(&shared);
        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut player = callback_shared.player();
                    for frame in data.chunks_mut(channels) {
                        frame.fill(player.next_sample());
                    }
                },
                move |err| {
                    error!("Audio output stream error: {}", err);
                    error_shared.fail(err.to_string());
                },
                None,
            )
            .map_err(|e| AudioError::LoadError {
                reason: format!("Failed to build output stream: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        stream.play().map_err(|e| AudioError::LoadError {
            reason: format!("Failed to start output stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let duration_ms = shared.player().duration_ms();
        shared.report();

        let ticker_shared = Arc::clone(&shared);
        let ticker = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(status_interval);
            loop {
                ticker.tick().await;
                if ticker_shared.has_failed() {
                    debug!("Output stream failed, status ticker stopped");
                    break;
                }
                ticker_shared.report();
            }
        });

        Ok(Self {
            shared,
            stream: Some(stream),
            ticker: Some(ticker),
            duration_ms,
        })
    }

    fn update(&self, apply: impl FnOnce(&mut Player)) {
        apply(&mut self.shared.player());
        self.shared.report();
    }
}

#[async_trait]
impl SoundDevice for CpalSound {
    fn duration_ms(&self) -> Option<u64> {
        Some(self.duration_ms)
    }

    async fn play(&mut self) -> CoreResult<()> {
        self.update(Player::play);
        Ok(())
    }

    async fn pause(&mut self) -> CoreResult<()> {
        self.update(Player::pause);
        Ok(())
    }

    async fn stop(&mut self) -> CoreResult<()> {
        self.update(Player::stop);
        Ok(())
    }

    async fn set_position(&mut self, position_ms: u64) -> CoreResult<()> {
        self.update(|p| p.seek(position_ms));
        Ok(())
    }

    async fn play_from_position(&mut self, position_ms: u64) -> CoreResult<()> {
        self.update(|p| {
            p.seek(position_ms);
            p.should_play = true;
        });
        Ok(())
    }

    async fn set_volume(&mut self, volume: f32) -> CoreResult<()> {
        self.update(|p| p.set_volume(volume));
        Ok(())
    }

    async fn set_muted(&mut self, muted: bool) -> CoreResult<()> {
        self.update(|p| p.set_muted(muted));
        Ok(())
    }

    async fn set_rate(&mut self, rate: f32, correct_pitch: bool) -> CoreResult<()> {
        check_rate(rate, correct_pitch)?;
        self.update(|p| p.set_rate(rate, correct_pitch));
        Ok(())
    }

    #[instrument(skip(self))]
    async fn unload(&mut self) -> CoreResult<()> {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                debug!(error = %e, "Output stream pause failed during unload");
            }
            drop(stream);
        }
        Ok(())
    }

    fn clear_status_sink(&mut self) {
        self.shared.clear_sink();
    }
}

impl Drop for CpalSound {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

/// Validate a rate change against the range the output supports.
#[track_caller]
pub fn check_rate(rate: f32, correct_pitch: bool) -> CoreResult<()> {
    if !(MIN_RATE..=MAX_RATE).contains(&rate) {
        return Err(AudioError::UnsupportedRate {
            rate,
            correct_pitch,
            reason: format!("rate must be within {}..={}", MIN_RATE, MAX_RATE),
            location: ErrorLocation::from(Location::caller()),
        });
    }
    Ok(())
}
