use crate::{
    AudioError, AudioHardware, Locator, PlaybackParams, RecordingPhase, RecordingSession,
    RecordingSettings,
    tests::support::FakeHardware,
};

use tokio::sync::mpsc;

fn sink(generation: u64) -> crate::StatusSink {
    let (tx, _rx) = mpsc::unbounded_channel();
    crate::StatusSink::new(generation, tx)
}

async fn prepared(hardware: &FakeHardware, generation: u64) -> RecordingSession {
    RecordingSession::prepare(hardware, &RecordingSettings::default(), sink(generation))
        .await
        .unwrap()
}

/// WHAT: A second capture cannot start while one holds the microphone
/// WHY: One microphone, one capture
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_started_capture_when_starting_another_then_hardware_busy() {
    // Given: One started capture
    let hardware = FakeHardware::new();
    let mut first = prepared(&hardware, 1).await;
    first.start().await.unwrap();
    let mut second = prepared(&hardware, 2).await;

    // When: Starting the second
    let result = second.start().await;

    // Then: HardwareBusy
    assert!(matches!(result, Err(AudioError::HardwareBusy { .. })));
    assert_eq!(second.phase(), RecordingPhase::Prepared);
}

/// WHAT: Stopping releases the microphone for the next capture
/// WHY: Back-to-back recordings must work
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_stopped_capture_when_starting_another_then_succeeds() {
    // Given: A capture that ran and stopped
    let hardware = FakeHardware::new();
    let mut first = prepared(&hardware, 1).await;
    first.start().await.unwrap();
    first.stop().await;

    // When: Starting a new capture
    let mut second = prepared(&hardware, 2).await;
    let result = second.start().await;

    // Then: Succeeds
    assert!(result.is_ok());
    assert!(hardware.capture_lock().is_held());
}

/// WHAT: Stop is idempotent, including after a hardware auto-stop
/// WHY: Manual and automatic stops may overlap
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_auto_finished_capture_when_stopping_twice_then_device_stopped_once() {
    // Given: A capture the hardware already finalized
    let hardware = FakeHardware::new();
    let mut recording = prepared(&hardware, 1).await;
    recording.start().await.unwrap();
    hardware.state().recorder_auto_finished = true;

    // When: Stopping twice
    recording.stop().await;
    recording.stop().await;

    // Then: Device stopped once
    assert_eq!(hardware.count("recorder.stop"), 1);
    assert_eq!(recording.phase(), RecordingPhase::Stopped);
    assert!(!hardware.capture_lock().is_held());
}

/// WHAT: The file locator is unavailable until the capture stops
/// WHY: A file still being written cannot be played
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_running_capture_when_asking_locator_then_not_ready() {
    // Given: Started capture
    let hardware = FakeHardware::new();
    let mut recording = prepared(&hardware, 1).await;
    recording.start().await.unwrap();

    // When: Asking for its locator
    let result = recording.locator();

    // Then: NotReady
    assert!(matches!(result, Err(AudioError::NotReady { .. })));
}

/// WHAT: A stopped capture becomes a playable sound for its file
/// WHY: Recordings are played back from disk
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_stopped_capture_when_converting_then_sound_points_at_file() {
    // Given: Stopped capture
    let hardware = FakeHardware::new();
    let mut recording = prepared(&hardware, 1).await;
    recording.start().await.unwrap();
    recording.stop().await;
    let expected = recording.locator().unwrap();

    // When: Converting to playback
    let playback = recording
        .into_playback(hardware.as_ref(), PlaybackParams::default(), sink(2))
        .await
        .unwrap();

    // Then: Same file, new generation
    assert_eq!(playback.locator(), &expected);
    assert!(matches!(expected, Locator::File(_)));
    assert_eq!(playback.generation(), 2);
}

/// WHAT: Restarting a stopped capture is rejected
/// WHY: A capture handle is single use
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_stopped_capture_when_starting_again_then_not_ready() {
    // Given: Stopped capture
    let hardware = FakeHardware::new();
    let mut recording = prepared(&hardware, 1).await;
    recording.start().await.unwrap();
    recording.stop().await;

    // When: Starting again
    let result = recording.start().await;

    // Then: NotReady
    assert!(matches!(result, Err(AudioError::NotReady { .. })));
}

/// WHAT: Unloading a recorded sound deletes its file
/// WHY: Superseded recordings must not pile up on disk
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_recorded_sound_when_unloading_then_file_deleted() {
    // Given: A finished capture backed by a real file
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("take.wav");
    std::fs::write(&path, b"RIFF").unwrap();
    let hardware = FakeHardware::new();
    hardware.state().recording_path = path.clone();
    let mut recording = prepared(&hardware, 1).await;
    recording.start().await.unwrap();
    recording.stop().await;
    let mut playback = recording
        .into_playback(hardware.as_ref(), PlaybackParams::default(), sink(2))
        .await
        .unwrap();
    assert!(path.exists());

    // When: Unloading
    playback.unload().await.unwrap();

    // Then: File is gone
    assert!(!path.exists());
}

/// WHAT: A recording that fails to load is deleted
/// WHY: Nothing can reference the file afterwards
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_unloadable_recording_when_converting_then_load_error_and_file_deleted() {
    // Given: A finished capture and a failing loader
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("take.wav");
    std::fs::write(&path, b"RIFF").unwrap();
    let hardware = FakeHardware::new();
    hardware.state().recording_path = path.clone();
    let mut recording = prepared(&hardware, 1).await;
    recording.start().await.unwrap();
    recording.stop().await;
    hardware.state().fail_load = true;

    // When: Converting
    let result = recording
        .into_playback(hardware.as_ref(), PlaybackParams::default(), sink(2))
        .await;

    // Then
    assert!(matches!(result, Err(AudioError::LoadError { .. })));
    assert!(!path.exists());
}
