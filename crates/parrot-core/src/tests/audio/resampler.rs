use crate::audio::Resampler;

// Test constants
const INPUT_SAMPLE_RATE: u32 = 22_050;
const OUTPUT_SAMPLE_RATE: u32 = 48_000;
const ONE_SECOND_INPUT_SAMPLES: usize = INPUT_SAMPLE_RATE as usize;
const ONE_SECOND_OUTPUT_SAMPLES: usize = OUTPUT_SAMPLE_RATE as usize;
const LENGTH_TOLERANCE: u64 = 200;
const TEST_SIGNAL_AMPLITUDE: f32 = 0.5;

/// WHAT: A 22.05kHz clip is upsampled to the device rate
/// WHY: Reference MP3s rarely match the output device's rate
#[test]
#[allow(clippy::unwrap_used)]
fn given_22khz_clip_when_resampling_to_48khz_then_length_approximately_correct() {
    // Given: Resampler configured for 22.05kHz -> 48kHz mono
    let mut resampler = Resampler::new(INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE, 1).unwrap();
    let input = vec![TEST_SIGNAL_AMPLITUDE; ONE_SECOND_INPUT_SAMPLES];

    // When: Resampling
    let output = resampler.resample(&input).unwrap();

    // Then: About one second at 48kHz
    assert!(
        (output.len() as i64 - ONE_SECOND_OUTPUT_SAMPLES as i64).unsigned_abs() < LENGTH_TOLERANCE,
        "Expected ~{} samples, got {}",
        ONE_SECOND_OUTPUT_SAMPLES,
        output.len()
    );
    assert!(output.iter().all(|s| s.is_finite()));
}

/// WHAT: Interleaved stereo keeps whole frames
/// WHY: A split frame would swap left and right
#[test]
#[allow(clippy::unwrap_used)]
fn given_stereo_clip_when_resampling_then_output_is_whole_frames() {
    // Given: Stereo resampler
    let mut resampler = Resampler::new(44_100, OUTPUT_SAMPLE_RATE, 2).unwrap();
    let input = vec![0.25_f32; 44_100 * 2];

    // When: Resampling
    let output = resampler.resample(&input).unwrap();

    // Then: Even sample count
    assert_eq!(output.len() % 2, 0);
    assert!(!output.is_empty());
}

/// WHAT: Empty samples return empty output
/// WHY: Edge case handling for zero-length input
#[test]
#[allow(clippy::unwrap_used)]
fn given_empty_samples_when_resampling_then_empty_output() {
    // Given: Resampler and empty input
    let mut resampler = Resampler::new(INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE, 1).unwrap();

    // When: Resampling empty data
    let output = resampler.resample(&[]).unwrap();

    // Then: Output is also empty
    assert!(output.is_empty());
}

/// WHAT: The filter delay is removed from the front of the output
/// WHY: A shifted clip would put the slider and the audio out of step
#[test]
#[allow(clippy::unwrap_used)]
fn given_impulse_mid_clip_when_resampling_then_peak_stays_at_same_time() {
    // Given: One second with a click half a second in
    let mut resampler = Resampler::new(INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE, 1).unwrap();
    let mut input = vec![0.0_f32; ONE_SECOND_INPUT_SAMPLES];
    input[ONE_SECOND_INPUT_SAMPLES / 2] = 1.0;

    // When: Resampling
    let output = resampler.resample(&input).unwrap();

    // Then: The loudest output sample is still half a second in
    let peak = output
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
        .map(|(index, _)| index)
        .unwrap();
    let expected = ONE_SECOND_OUTPUT_SAMPLES / 2;
    assert!(
        peak.abs_diff(expected) <= 20,
        "Expected peak near {}, got {}",
        expected,
        peak
    );
}
