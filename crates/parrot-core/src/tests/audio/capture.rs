use crate::{
    StatusSink,
    audio::{CaptureShared, WavFileWriter},
};

use std::path::Path;

use tokio::sync::mpsc;

// Test constants
const SAMPLE_RATE: u32 = 8_000;
const MAX_FRAMES: u64 = 600;

#[allow(clippy::unwrap_used)]
fn shared_writing_to(path: &Path, max_frames: Option<u64>) -> CaptureShared {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let writer: WavFileWriter = hound::WavWriter::create(path, spec).unwrap();
    let (tx, _rx) = mpsc::unbounded_channel();
    CaptureShared::new(writer, StatusSink::new(1, tx), 1, SAMPLE_RATE, 16, max_frames)
}

/// WHAT: Capture stops writing at the frame limit
/// WHY: A recording must never exceed its maximum duration
#[test]
#[allow(clippy::unwrap_used)]
fn given_frame_limit_when_writing_past_it_then_truncated_and_flagged() {
    // Given: A capture limited to 600 frames
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("take.wav");
    let shared = shared_writing_to(&path, Some(MAX_FRAMES));

    // When: The callback delivers 1000 frames
    shared.write(&[0.1; 1_000]);
    shared.finalize().unwrap();

    // Then: Exactly the limit is on disk
    assert_eq!(shared.frames_written(), MAX_FRAMES);
    assert!(shared.limit_reached());
    assert_eq!(shared.duration_ms(), 75);
    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(u64::from(reader.len()), MAX_FRAMES);
}

/// WHAT: Writes below the limit accumulate without tripping it
/// WHY: The auto-finish must only fire once the limit is really hit
#[test]
#[allow(clippy::unwrap_used)]
fn given_frame_limit_when_writing_below_it_then_not_flagged() {
    // Given
    let dir = tempfile::tempdir().unwrap();
    let shared = shared_writing_to(&dir.path().join("take.wav"), Some(MAX_FRAMES));

    // When: Two short callbacks
    shared.write(&[0.1; 200]);
    shared.write(&[0.1; 200]);

    // Then
    assert_eq!(shared.frames_written(), 400);
    assert!(!shared.limit_reached());
}

/// WHAT: Finalizing twice is harmless and later writes are dropped
/// WHY: Stop and the auto-finish can both try to close the file
#[test]
#[allow(clippy::unwrap_used)]
fn given_finalized_capture_when_finalizing_and_writing_again_then_no_op() {
    // Given: A finalized capture with some audio
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("take.wav");
    let shared = shared_writing_to(&path, None);
    shared.write(&[0.1; 100]);

    // When
    let first = shared.finalize().unwrap();
    let second = shared.finalize().unwrap();
    shared.write(&[0.1; 100]);

    // Then: Only the first finalize did work, the file is unchanged
    assert!(first);
    assert!(!second);
    assert_eq!(shared.frames_written(), 100);
    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.len(), 100);
}
