#![allow(clippy::unwrap_used)]

//! Scripted hardware for driving the coordinator without audio devices.
//!
//! Every operation is appended to a call log and answered with the status a
//! real device would report, sent through the handle's sink.

use crate::{
    AudioError, AudioHardware, AudioModePolicy, CaptureLock, CoordinatorOptions, CoreResult,
    LoadedStatus, Locator, PlaybackParams, PlaybackStatus, RecorderDevice, RecordingSettings,
    RecordingStatus, SessionCoordinator, SoundDevice, StatusSink,
};

use std::{
    panic::Location,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use error_location::ErrorLocation;

pub(crate) const CLIP_DURATION_MS: u64 = 10_000;

pub(crate) struct FakeState {
    pub calls: Vec<String>,
    pub recording_sinks: Vec<StatusSink>,
    pub playback_sinks: Vec<StatusSink>,
    pub permission: bool,
    pub fail_load: bool,
    pub reject_rate: bool,
    pub recorder_auto_finished: bool,
    pub clip_duration_ms: u64,
    pub recording_path: PathBuf,
}

pub(crate) struct FakeHardware {
    state: Arc<Mutex<FakeState>>,
    capture_lock: CaptureLock,
}

impl FakeHardware {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new(Mutex::new(FakeState {
                calls: Vec::new(),
                recording_sinks: Vec::new(),
                playback_sinks: Vec::new(),
                permission: true,
                fail_load: false,
                reject_rate: false,
                recorder_auto_finished: false,
                clip_duration_ms: CLIP_DURATION_MS,
                recording_path: PathBuf::from("/nonexistent/parrot-test/recording.wav"),
            })),
            capture_lock: CaptureLock::default(),
        })
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub(crate) fn count(&self, call: &str) -> usize {
        self.state().calls.iter().filter(|c| c.as_str() == call).count()
    }

    /// Hardware hits its length limit and finishes the capture on its own.
    pub(crate) fn finish_recording(&self, duration_ms: u64) {
        let mut state = self.state();
        state.recorder_auto_finished = true;
        let sink = state.recording_sinks.last().cloned().unwrap();
        drop(state);
        sink.recording(RecordingStatus::Finished { duration_ms });
    }

    pub(crate) fn last_playback_sink(&self) -> StatusSink {
        self.state().playback_sinks.last().cloned().unwrap()
    }
}

#[async_trait]
impl AudioHardware for FakeHardware {
    async fn request_recording_permission(&self) -> bool {
        self.state().calls.push("request_permission".to_string());
        self.state().permission
    }

    async fn set_audio_mode(&self, policy: &AudioModePolicy) -> CoreResult<()> {
        let name = if policy.allows_recording {
            "mode:recording"
        } else {
            "mode:playback"
        };
        self.state().calls.push(name.to_string());
        Ok(())
    }

    fn create_recorder(&self) -> Box<dyn RecorderDevice> {
        Box::new(FakeRecorder {
            state: Arc::clone(&self.state),
            sink: None,
            duration_ms: 0,
        })
    }

    async fn load_sound(
        &self,
        locator: &Locator,
        params: &PlaybackParams,
        sink: StatusSink,
    ) -> CoreResult<Box<dyn SoundDevice>> {
        let mut state = self.state();
        state.calls.push(format!(
            "load:{} play={} muted={}",
            locator, params.should_play, params.muted
        ));
        if state.fail_load {
            return Err(AudioError::LoadError {
                reason: "scripted failure".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        state.playback_sinks.push(sink.clone());
        let duration_ms = state.clip_duration_ms;
        drop(state);

        let sound = FakeSound {
            state: Arc::clone(&self.state),
            sink: Some(sink),
            status: LoadedStatus {
                duration_ms: Some(duration_ms),
                position_ms: 0,
                should_play: params.should_play,
                is_playing: params.should_play,
                rate: params.rate,
                muted: params.muted,
                volume: params.volume,
                should_correct_pitch: params.should_correct_pitch,
                did_just_finish: false,
            },
        };
        sound.emit();
        Ok(Box::new(sound))
    }

    fn capture_lock(&self) -> CaptureLock {
        self.capture_lock.clone()
    }
}

struct FakeRecorder {
    state: Arc<Mutex<FakeState>>,
    sink: Option<StatusSink>,
    duration_ms: u64,
}

impl FakeRecorder {
    fn log(&self, call: &str) {
        self.state.lock().unwrap().calls.push(call.to_string());
    }

    fn emit(&self, status: RecordingStatus) {
        if let Some(sink) = self.sink.as_ref() {
            sink.recording(status);
        }
    }
}

#[async_trait]
impl RecorderDevice for FakeRecorder {
    async fn prepare(&mut self, _settings: &RecordingSettings, sink: StatusSink) -> CoreResult<()> {
        self.log("recorder.prepare");
        {
            let mut state = self.state.lock().unwrap();
            state.recording_sinks.push(sink.clone());
            state.recorder_auto_finished = false;
        }
        self.sink = Some(sink);
        self.emit(RecordingStatus::Active {
            is_recording: false,
            duration_ms: 0,
        });
        Ok(())
    }

    async fn start(&mut self) -> CoreResult<()> {
        self.log("recorder.start");
        self.emit(RecordingStatus::Active {
            is_recording: true,
            duration_ms: 0,
        });
        Ok(())
    }

    async fn stop(&mut self) -> CoreResult<()> {
        self.log("recorder.stop");
        if self.state.lock().unwrap().recorder_auto_finished {
            return Err(AudioError::DeviceError {
                reason: "already finalized".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        self.duration_ms = 1_500;
        self.emit(RecordingStatus::Finished {
            duration_ms: self.duration_ms,
        });
        Ok(())
    }

    fn output_path(&self) -> Option<PathBuf> {
        Some(self.state.lock().unwrap().recording_path.clone())
    }

    fn clear_status_sink(&mut self) {
        self.sink = None;
    }
}

struct FakeSound {
    state: Arc<Mutex<FakeState>>,
    sink: Option<StatusSink>,
    status: LoadedStatus,
}

impl FakeSound {
    fn log(&self, call: &str) {
        self.state.lock().unwrap().calls.push(call.to_string());
    }

    fn emit(&self) {
        if let Some(sink) = self.sink.as_ref() {
            sink.playback(PlaybackStatus::Loaded(self.status.clone()));
        }
    }

    fn duration(&self) -> u64 {
        self.status.duration_ms.unwrap_or(0)
    }
}

#[async_trait]
impl SoundDevice for FakeSound {
    fn duration_ms(&self) -> Option<u64> {
        self.status.duration_ms
    }

    async fn play(&mut self) -> CoreResult<()> {
        self.log("sound.play");
        self.status.should_play = true;
        self.status.is_playing = true;
        self.emit();
        Ok(())
    }

    async fn pause(&mut self) -> CoreResult<()> {
        self.log("sound.pause");
        self.status.should_play = false;
        self.status.is_playing = false;
        self.emit();
        Ok(())
    }

    async fn stop(&mut self) -> CoreResult<()> {
        self.log("sound.stop");
        self.status.should_play = false;
        self.status.is_playing = false;
        self.status.position_ms = 0;
        self.emit();
        Ok(())
    }

    async fn set_position(&mut self, position_ms: u64) -> CoreResult<()> {
        self.log("sound.set_position");
        self.status.position_ms = position_ms.min(self.duration());
        self.emit();
        Ok(())
    }

    async fn play_from_position(&mut self, position_ms: u64) -> CoreResult<()> {
        self.log("sound.play_from_position");
        self.status.position_ms = position_ms.min(self.duration());
        self.status.should_play = true;
        self.status.is_playing = true;
        self.emit();
        Ok(())
    }

    async fn set_volume(&mut self, volume: f32) -> CoreResult<()> {
        self.log("sound.set_volume");
        self.status.volume = volume;
        self.emit();
        Ok(())
    }

    async fn set_muted(&mut self, muted: bool) -> CoreResult<()> {
        self.log("sound.set_muted");
        self.status.muted = muted;
        self.emit();
        Ok(())
    }

    async fn set_rate(&mut self, rate: f32, correct_pitch: bool) -> CoreResult<()> {
        self.log("sound.set_rate");
        if self.state.lock().unwrap().reject_rate {
            return Err(AudioError::UnsupportedRate {
                rate,
                correct_pitch,
                reason: "scripted refusal".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        self.status.rate = rate;
        self.status.should_correct_pitch = correct_pitch;
        self.emit();
        Ok(())
    }

    async fn unload(&mut self) -> CoreResult<()> {
        self.log("sound.unload");
        Ok(())
    }

    fn clear_status_sink(&mut self) {
        self.sink = None;
    }
}

/// Coordinator over `hardware` with permission already resolved.
pub(crate) async fn coordinator(hardware: &Arc<FakeHardware>) -> SessionCoordinator {
    let hardware: Arc<dyn AudioHardware> = hardware.clone();
    let mut coordinator = SessionCoordinator::new(hardware, CoordinatorOptions::default());
    coordinator.request_permissions().await;
    coordinator.drain_events().await;
    coordinator
}

/// Coordinator holding a loaded, paused recording.
pub(crate) async fn coordinator_with_playback(hardware: &Arc<FakeHardware>) -> SessionCoordinator {
    let mut coordinator = coordinator(hardware).await;
    coordinator.begin_recording().await.unwrap();
    coordinator.end_recording_and_enable_playback().await.unwrap();
    coordinator.drain_events().await;
    coordinator
}
