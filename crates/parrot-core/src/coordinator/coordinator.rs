use crate::{
    AudioError, CoreResult,
    audio::{
        AudioHardware, AudioModePolicy, Generation, HardwareEvent, Locator, PlaybackSession,
        PlaybackStatus, RecordingSession, RecordingSettings, RecordingStatus, StatusSink,
    },
    coordinator::{Phase, SessionState},
};

use std::{panic::Location, sync::Arc};

use error_location::ErrorLocation;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, instrument, warn};

/// Tunables for [`SessionCoordinator`].
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorOptions {
    /// Passed to every recorder as-is.
    pub recording_settings: RecordingSettings,
    /// Rewind to 0 when a clip plays to its end.
    pub stop_at_end: bool,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            recording_settings: RecordingSettings::default(),
            stop_at_end: true,
        }
    }
}

/// The audio session state machine.
///
/// Owns at most one recording or one playback handle at a time and keeps
/// [`SessionState`] consistent with the statuses the hardware reports.
/// Every handle gets its own generation; statuses stamped with any other
/// generation are ignored.
///
/// Commands and hardware events are processed one at a time on the task
/// that owns the coordinator. Drive events with [`Self::next_event`] and
/// [`Self::handle_event`].
pub struct SessionCoordinator {
    hardware: Arc<dyn AudioHardware>,
    options: CoordinatorOptions,
    state: SessionState,
    recording: Option<RecordingSession>,
    playback: Option<PlaybackSession>,
    events_tx: mpsc::UnboundedSender<HardwareEvent>,
    events_rx: mpsc::UnboundedReceiver<HardwareEvent>,
    snapshot: watch::Sender<SessionState>,
    next_generation: Generation,
    /// Playback generation that reported a fatal error.
    failed_generation: Option<Generation>,
}

impl SessionCoordinator {
    /// Coordinator over `hardware`, starting idle without permission.
    pub fn new(hardware: Arc<dyn AudioHardware>, options: CoordinatorOptions) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let state = SessionState::default();
        let (snapshot, _) = watch::channel(state.clone());

        Self {
            hardware,
            options,
            state,
            recording: None,
            playback: None,
            events_tx,
            events_rx,
            snapshot,
            next_generation: 1,
            failed_generation: None,
        }
    }

    /// Receive every published snapshot. This is how views observe the
    /// session.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.snapshot.subscribe()
    }

    /// Current snapshot.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Whether a recording handle exists.
    pub fn holds_recording(&self) -> bool {
        self.recording.is_some()
    }

    /// Whether a playback handle exists.
    pub fn holds_playback(&self) -> bool {
        self.playback.is_some()
    }

    /// Ask the hardware for microphone permission and remember the answer.
    #[instrument(skip(self))]
    pub async fn request_permissions(&mut self) -> bool {
        let granted = self.hardware.request_recording_permission().await;
        self.state.has_recording_permission = granted;
        self.publish();
        info!(granted, "Recording permission resolved");
        granted
    }

    /// Tear down any loaded sound and start a new capture.
    ///
    /// # Errors
    ///
    /// `PermissionDenied` without microphone permission and `InvalidPhase`
    /// outside `Idle`/`PlaybackLoaded`; both leave the state untouched.
    /// Prepare and start failures return the session to `Idle`.
    #[instrument(skip(self), fields(phase = ?self.state.phase))]
    pub async fn begin_recording(&mut self) -> CoreResult<()> {
        if !self.state.has_recording_permission {
            return Err(AudioError::PermissionDenied {
                location: ErrorLocation::from(Location::caller()),
            });
        }
        self.ensure_phase("begin recording", &[Phase::Idle, Phase::PlaybackLoaded])?;

        self.state.is_loading = true;
        self.publish();

        self.teardown_playback().await;

        let result = self.prepare_and_start().await;
        match result {
            Ok(recording) => {
                info!(generation = recording.generation(), "Recording begun");
                self.recording = Some(recording);
                self.state.phase = Phase::Recording;
                self.state.is_loading = false;
                self.state.last_error = None;
                self.publish();
                Ok(())
            }
            Err(e) => {
                warn!(error = ?e, "Failed to begin recording");
                self.state.phase = Phase::Idle;
                self.state.is_recording = false;
                self.state.is_loading = false;
                self.publish();
                Err(e)
            }
        }
    }

    async fn prepare_and_start(&mut self) -> CoreResult<RecordingSession> {
        let hardware = Arc::clone(&self.hardware);
        hardware
            .set_audio_mode(&AudioModePolicy::recording())
            .await?;

        let sink = self.issue_sink();
        let mut recording =
            RecordingSession::prepare(hardware.as_ref(), &self.options.recording_settings, sink)
                .await?;

        if let Err(e) = recording.start().await {
            recording.discard();
            return Err(e);
        }

        self.state.recording_duration_ms = None;
        Ok(recording)
    }

    /// Stop the capture and load it back as the playback sound.
    ///
    /// A no-op outside `Recording`, so a duplicate finish signal does not
    /// stop twice.
    ///
    /// # Errors
    ///
    /// `LoadError` when the captured file cannot be opened; the session is
    /// then `Idle`.
    #[instrument(skip(self), fields(phase = ?self.state.phase))]
    pub async fn end_recording_and_enable_playback(&mut self) -> CoreResult<()> {
        if self.state.phase != Phase::Recording {
            debug!("Not recording, ignoring stop request");
            return Ok(());
        }
        if self.recording.is_none() {
            debug!("No recording handle, ignoring stop request");
            return Ok(());
        }

        self.state.is_loading = true;
        self.state.phase = Phase::StoppingRecording;
        self.publish();

        if let Some(recording) = self.recording.as_mut() {
            recording.stop().await;
        }

        // The handle is still current, so the final length is applied.
        self.apply_queued_recording_statuses();
        self.state.is_recording = false;
        self.publish();

        let Some(recording) = self.recording.take() else {
            return Ok(());
        };

        let hardware = Arc::clone(&self.hardware);
        if let Err(e) = hardware.set_audio_mode(&AudioModePolicy::playback()).await {
            warn!(error = ?e, "Failed to apply playback audio mode");
        }

        let params = self.state.playback_params(false);
        let sink = self.issue_sink();
        match recording.into_playback(hardware.as_ref(), params, sink).await {
            Ok(playback) => {
                info!(generation = playback.generation(), "Recording ready for playback");
                self.install_playback(playback);
                self.state.phase = Phase::PlaybackLoaded;
                self.state.is_loading = false;
                self.publish();
                Ok(())
            }
            Err(e) => {
                error!(error = ?e, "Failed to load recording for playback");
                self.state.phase = Phase::Idle;
                self.state.is_loading = false;
                self.publish();
                Err(e)
            }
        }
    }

    /// Toggle recording based on the current phase.
    pub async fn on_record_button_pressed(&mut self) -> CoreResult<()> {
        match self.state.phase {
            Phase::Recording => self.end_recording_and_enable_playback().await,
            _ => self.begin_recording().await,
        }
    }

    /// Replace any loaded sound with `locator` and start playing it.
    ///
    /// # Errors
    ///
    /// `InvalidPhase` while recording, `LoadError` when the clip cannot be
    /// opened; the session is then `Idle`.
    #[instrument(skip(self), fields(locator = %locator))]
    pub async fn play_reference(&mut self, locator: Locator) -> CoreResult<()> {
        self.ensure_phase("play a reference clip", &[Phase::Idle, Phase::PlaybackLoaded])?;

        self.state.is_loading = true;
        self.publish();

        self.teardown_playback().await;

        let hardware = Arc::clone(&self.hardware);
        if let Err(e) = hardware.set_audio_mode(&AudioModePolicy::playback()).await {
            warn!(error = ?e, "Failed to apply playback audio mode");
        }

        let params = self.state.playback_params(true);
        let sink = self.issue_sink();
        match PlaybackSession::load(hardware.as_ref(), locator, params, sink).await {
            Ok(playback) => {
                self.install_playback(playback);
                self.state.phase = Phase::PlaybackLoaded;
                self.state.is_loading = false;
                self.publish();
                Ok(())
            }
            Err(e) => {
                error!(error = ?e, "Failed to load reference clip");
                self.state.phase = Phase::Idle;
                self.state.is_loading = false;
                self.publish();
                Err(e)
            }
        }
    }

    /// Pause when playing, play otherwise.
    pub async fn on_play_pause_pressed(&mut self) -> CoreResult<()> {
        let is_playing = self.state.is_playing;
        let Some(playback) = self.playback.as_mut() else {
            return Ok(());
        };
        if is_playing {
            playback.pause().await
        } else {
            playback.play().await
        }
    }

    /// Stop and rewind the loaded sound.
    pub async fn on_stop_pressed(&mut self) -> CoreResult<()> {
        match self.playback.as_mut() {
            Some(playback) => playback.stop().await,
            None => Ok(()),
        }
    }

    /// Flip the mute flag of the loaded sound.
    pub async fn on_mute_toggled(&mut self) -> CoreResult<()> {
        let muted = !self.state.muted;
        match self.playback.as_mut() {
            Some(playback) => playback.set_muted(muted).await,
            None => Ok(()),
        }
    }

    /// Set the output volume of the loaded sound.
    pub async fn set_volume(&mut self, volume: f32) -> CoreResult<()> {
        match self.playback.as_mut() {
            Some(playback) => playback.set_volume(volume).await,
            None => Ok(()),
        }
    }

    /// Ask for a new playback rate.
    ///
    /// A refusal is logged as a warning and dropped; the state keeps the
    /// last confirmed rate until a status reports otherwise.
    #[instrument(skip(self))]
    pub async fn set_rate(&mut self, rate: f32, correct_pitch: bool) {
        let Some(playback) = self.playback.as_mut() else {
            return;
        };
        if let Err(e) = playback.set_rate(rate, correct_pitch).await {
            warn!(rate, correct_pitch, error = %e, "Rate change refused");
        }
    }

    /// Re-apply the current rate with pitch correction flipped.
    pub async fn toggle_pitch_correction(&mut self) {
        let rate = self.state.rate;
        let correct_pitch = !self.state.should_correct_pitch;
        self.set_rate(rate, correct_pitch).await;
    }

    /// Start a seek gesture: remember whether to resume, then pause.
    /// Repeated calls during the same gesture are ignored.
    pub async fn begin_seek(&mut self) -> CoreResult<()> {
        if self.state.is_seek_pending {
            return Ok(());
        }
        if self.playback.is_none() {
            return Ok(());
        }

        self.state.is_seek_pending = true;
        self.state.pending_resume_on_seek_end = self.state.should_play;
        self.publish();

        match self.playback.as_mut() {
            Some(playback) => playback.pause().await,
            None => Ok(()),
        }
    }

    /// Finish a seek at `fraction` of the clip length, resuming playback if
    /// it was playing when the gesture began.
    #[instrument(skip(self))]
    pub async fn commit_seek(&mut self, fraction: f64) -> CoreResult<()> {
        let resume = self.state.pending_resume_on_seek_end;
        let duration = self.state.sound_duration_ms.unwrap_or(0);
        let position = (fraction.clamp(0.0, 1.0) * duration as f64).round() as i64;

        self.state.is_seek_pending = false;
        self.state.pending_resume_on_seek_end = false;
        self.publish();

        let Some(playback) = self.playback.as_mut() else {
            return Ok(());
        };
        if resume {
            playback.play_from_position(position).await
        } else {
            playback.seek_to(position).await
        }
    }

    /// Wait for the next hardware status.
    pub async fn next_event(&mut self) -> Option<HardwareEvent> {
        self.events_rx.recv().await
    }

    /// Apply every status already queued.
    pub async fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event).await;
        }
    }

    /// Apply one hardware status.
    pub async fn handle_event(&mut self, event: HardwareEvent) {
        match event {
            HardwareEvent::Recording { generation, status } => {
                self.on_recording_status(generation, status).await
            }
            HardwareEvent::Playback { generation, status } => {
                self.on_playback_status(generation, status).await
            }
        }
    }

    /// Apply a capture status. Statuses for anything but the current
    /// recording are ignored.
    pub async fn on_recording_status(&mut self, generation: Generation, status: RecordingStatus) {
        let current = self.recording.as_ref().map(RecordingSession::generation);
        if current != Some(generation) {
            debug!(generation, current = ?current, "Ignoring stale recording status");
            return;
        }

        let finished = matches!(status, RecordingStatus::Finished { .. });
        self.apply_recording_status(status);
        self.publish();

        if finished && !self.state.is_loading && self.state.phase == Phase::Recording {
            info!(
                duration_ms = ?self.state.recording_duration_ms,
                "Hardware finished the recording"
            );
            if let Err(e) = self.end_recording_and_enable_playback().await {
                error!(error = ?e, "Automatic stop failed");
            }
        }
    }

    fn apply_recording_status(&mut self, status: RecordingStatus) {
        match status {
            RecordingStatus::Active {
                is_recording,
                duration_ms,
            } => {
                self.state.is_recording = is_recording;
                self.state.recording_duration_ms = Some(duration_ms);
            }
            RecordingStatus::Finished { duration_ms } => {
                self.state.is_recording = false;
                self.state.recording_duration_ms = Some(duration_ms);
            }
        }
    }

    /// Apply capture statuses already queued for the current recording.
    /// Playback statuses seen here belong to no live handle and are dropped.
    fn apply_queued_recording_statuses(&mut self) {
        let current = self.recording.as_ref().map(RecordingSession::generation);
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                HardwareEvent::Recording { generation, status } if current == Some(generation) => {
                    self.apply_recording_status(status);
                }
                other => debug!(event = ?other, "Dropping stale status while stopping recording"),
            }
        }
    }

    /// Apply a sound status. Statuses for anything but the current sound
    /// are ignored.
    pub async fn on_playback_status(&mut self, generation: Generation, status: PlaybackStatus) {
        let current = self.playback.as_ref().map(PlaybackSession::generation);
        if current != Some(generation) {
            debug!(generation, current = ?current, "Ignoring stale playback status");
            return;
        }

        match status {
            PlaybackStatus::Loaded(_) if self.failed_generation == Some(generation) => {
                debug!(generation, "Ignoring status from a failed sound");
            }
            PlaybackStatus::Loaded(loaded) => {
                self.state.is_playback_allowed = true;
                self.state.sound_duration_ms = loaded.duration_ms;
                self.state.sound_position_ms = Some(loaded.position_ms);
                self.state.should_play = loaded.should_play;
                self.state.is_playing = loaded.is_playing;
                self.state.rate = loaded.rate;
                self.state.muted = loaded.muted;
                self.state.volume = loaded.volume;
                self.state.should_correct_pitch = loaded.should_correct_pitch;
                self.publish();

                if loaded.did_just_finish && self.options.stop_at_end {
                    debug!("Clip reached its end, rewinding");
                    if let Some(playback) = self.playback.as_mut() {
                        if let Err(e) = playback.stop().await {
                            debug!(error = ?e, "Rewind at end failed");
                        }
                    }
                }
            }
            PlaybackStatus::NotLoaded { error } => {
                self.state.clear_sound();
                if let Some(message) = error {
                    self.failed_generation = Some(generation);
                    let status_error = AudioError::StatusError {
                        message: message.clone(),
                        location: ErrorLocation::from(Location::caller()),
                    };
                    error!(error = %status_error, "Playback reported an error");
                    self.state.last_error = Some(message);
                }
                self.publish();
            }
        }
    }

    async fn teardown_playback(&mut self) {
        let Some(mut playback) = self.playback.take() else {
            return;
        };

        self.state.phase = Phase::Unloading;
        self.publish();

        if let Err(e) = playback.unload().await {
            debug!(error = ?e, "Unload failed during teardown");
        }

        self.state.clear_sound();
        self.state.phase = Phase::Idle;
        self.publish();
    }

    fn install_playback(&mut self, playback: PlaybackSession) {
        self.state.sound_duration_ms = playback.duration_ms();
        self.state.last_error = None;
        self.playback = Some(playback);
    }

    fn issue_sink(&mut self) -> StatusSink {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.failed_generation = None;
        StatusSink::new(generation, self.events_tx.clone())
    }

    #[track_caller]
    fn ensure_phase(&self, operation: &'static str, allowed: &[Phase]) -> CoreResult<()> {
        if allowed.contains(&self.state.phase) {
            return Ok(());
        }
        Err(AudioError::InvalidPhase {
            operation,
            phase: self.state.phase,
            location: ErrorLocation::from(Location::caller()),
        })
    }

    fn publish(&self) {
        self.snapshot.send_replace(self.state.clone());
    }
}

impl Drop for SessionCoordinator {
    fn drop(&mut self) {
        if let Some(recording) = self.recording.as_mut() {
            recording.discard();
        }
    }
}
