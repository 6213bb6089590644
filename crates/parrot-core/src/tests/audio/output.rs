use crate::{
    AudioError, HardwareEvent, MAX_RATE, MIN_RATE, PlaybackParams, PlaybackStatus, StatusSink,
    audio::{Player, SoundShared},
    check_rate,
};

use std::f32::consts::TAU;

use tokio::sync::mpsc;

// Test constants
const SAMPLE_RATE: u32 = 48_000;
const ONE_SECOND: usize = SAMPLE_RATE as usize;
const TONE_HZ: f32 = 440.0;

fn playing() -> PlaybackParams {
    PlaybackParams {
        should_play: true,
        ..PlaybackParams::default()
    }
}

fn tone(frames: usize) -> Vec<f32> {
    (0..frames)
        .map(|i| (TAU * TONE_HZ * i as f32 / SAMPLE_RATE as f32).sin() * 0.5)
        .collect()
}

fn zero_crossings(samples: &[f32]) -> usize {
    samples
        .windows(2)
        .filter(|pair| (pair[0] < 0.0) != (pair[1] < 0.0))
        .count()
}

/// WHAT: Rates outside the supported range are refused
/// WHY: The player cannot go arbitrarily fast or slow
#[test]
fn given_rate_outside_range_when_checking_then_unsupported_rate() {
    // Given / When: Rates just past either bound
    let too_fast = check_rate(MAX_RATE + 0.5, false);
    let too_slow = check_rate(MIN_RATE / 2.0, true);

    // Then: Both refused
    assert!(matches!(too_fast, Err(AudioError::UnsupportedRate { .. })));
    assert!(matches!(
        too_slow,
        Err(AudioError::UnsupportedRate {
            correct_pitch: true,
            ..
        })
    ));
}

/// WHAT: In-range rates are accepted with or without pitch correction
/// WHY: Pitch correction is the default and must not block speed changes
#[test]
fn given_rate_in_range_when_checking_then_accepted_either_way() {
    // Given / When: Double speed both ways
    let corrected = check_rate(2.0, true);
    let uncorrected = check_rate(2.0, false);

    // Then
    assert!(corrected.is_ok());
    assert!(uncorrected.is_ok());
}

/// WHAT: Reaching the end stops the player and flags it once
/// WHY: The coordinator rewinds on the first finished status only
#[test]
fn given_playing_clip_when_reaching_end_then_finished_reported_once() {
    // Given: A 100-frame clip, playing
    let mut player = Player::new(vec![0.25; 100], SAMPLE_RATE, &playing());

    // When: Pulling past the end
    for _ in 0..150 {
        player.next_sample();
    }
    let first = player.status();
    let second = player.status();

    // Then: Finished once, no longer playing
    assert!(first.did_just_finish);
    assert!(!first.should_play);
    assert!(!first.is_playing);
    assert!(!second.did_just_finish);
    assert_eq!(player.next_sample(), 0.0);
}

/// WHAT: Double rate without pitch correction consumes the clip twice as fast
/// WHY: Speed and pitch follow the rate when correction is off
#[test]
fn given_double_rate_uncorrected_when_playing_then_finishes_in_half_the_samples() {
    // Given: 1000 frames at 2x
    let mut player = Player::new(vec![0.25; 1_000], SAMPLE_RATE, &playing());
    player.set_rate(2.0, false);

    // When: Pulling samples until it stops
    let mut pulled = 0;
    while player.status().should_play && pulled < 2_000 {
        player.next_sample();
        pulled += 1;
    }

    // Then: About 500 samples plus the end tick
    assert!((500..=502).contains(&pulled), "pulled {}", pulled);
}

/// WHAT: Pitch-corrected speed-up keeps the tone's frequency
/// WHY: Language practice at a slower or faster pace must not change the voice
#[test]
fn given_double_rate_when_pitch_corrected_then_tone_frequency_kept() {
    // Given: Two seconds of a 440 Hz tone, played at 2x both ways
    let clip = tone(2 * ONE_SECOND);
    let mut corrected = Player::new(clip.clone(), SAMPLE_RATE, &playing());
    corrected.set_rate(2.0, true);
    let mut shifted = Player::new(clip, SAMPLE_RATE, &playing());
    shifted.set_rate(2.0, false);

    // When: Pulling half a second of output from each
    let corrected_out: Vec<f32> = (0..ONE_SECOND / 2).map(|_| corrected.next_sample()).collect();
    let shifted_out: Vec<f32> = (0..ONE_SECOND / 2).map(|_| shifted.next_sample()).collect();

    // Then: Corrected keeps ~440 crossings, uncorrected doubles them
    let original = zero_crossings(&tone(ONE_SECOND / 2));
    let kept = zero_crossings(&corrected_out);
    let doubled = zero_crossings(&shifted_out);
    assert!(
        kept.abs_diff(original) < original / 5,
        "corrected {} vs original {}",
        kept,
        original
    );
    assert!(
        doubled.abs_diff(original * 2) < original / 5,
        "uncorrected {} vs original {}",
        doubled,
        original
    );
}

/// WHAT: Pitch-corrected playback still moves the playhead at the rate
/// WHY: The position slider must track real progress through the clip
#[test]
fn given_double_rate_when_pitch_corrected_then_position_advances_twice_as_fast() {
    // Given: One second of tone at 2x with correction
    let mut player = Player::new(tone(ONE_SECOND), SAMPLE_RATE, &playing());
    player.set_rate(2.0, true);

    // When: A quarter second of output
    for _ in 0..ONE_SECOND / 4 {
        player.next_sample();
    }

    // Then: Half a second into the clip
    let position = player.status().position_ms;
    assert!((495..=505).contains(&position), "position {}", position);
}

/// WHAT: Seeking past the end lands on the end
/// WHY: The slider can send fractions a little above one
#[test]
fn given_clip_when_seeking_past_end_then_clamped_to_duration() {
    // Given: A one-second clip
    let mut player = Player::new(vec![0.0; ONE_SECOND], SAMPLE_RATE, &PlaybackParams::default());

    // When: Seeking to 5 s
    player.seek(5_000);

    // Then: At the end
    assert_eq!(player.status().position_ms, player.duration_ms());
    assert_eq!(player.duration_ms(), 1_000);
}

/// WHAT: Play after the end starts again from the beginning
/// WHY: Pressing play on a finished clip must not produce silence
#[test]
fn given_finished_clip_when_playing_then_rewinds_to_start() {
    // Given: A clip that played to its end
    let mut player = Player::new(vec![0.5; 10], SAMPLE_RATE, &playing());
    for _ in 0..20 {
        player.next_sample();
    }
    assert!(!player.status().should_play);

    // When: Playing again
    player.play();

    // Then: Audible from frame zero
    assert_eq!(player.status().position_ms, 0);
    assert_eq!(player.next_sample(), 0.5);
}

/// WHAT: Muted output is silent but still advances
/// WHY: Mute must not freeze the clip
#[test]
fn given_muted_player_when_pulling_then_silent_and_advancing() {
    // Given: A muted playing clip
    let params = PlaybackParams {
        muted: true,
        ..playing()
    };
    let mut player = Player::new(vec![0.5; ONE_SECOND], SAMPLE_RATE, &params);

    // When: Pulling 100 ms
    let out: Vec<f32> = (0..ONE_SECOND / 10).map(|_| player.next_sample()).collect();

    // Then
    assert!(out.iter().all(|&s| s == 0.0));
    assert_eq!(player.status().position_ms, 100);
}

/// WHAT: A stream failure is reported once and silences later statuses
/// WHY: A dead output must not keep telling the session it is loaded
#[test]
#[allow(clippy::unwrap_used)]
fn given_sound_when_stream_fails_then_not_loaded_sent_once_and_ticks_suppressed() {
    // Given: Shared player state reporting on a channel
    let (tx, mut rx) = mpsc::unbounded_channel();
    let player = Player::new(vec![0.5; 100], SAMPLE_RATE, &playing());
    let shared = SoundShared::new(player, StatusSink::new(7, tx));

    // When: The stream errors twice, then the ticker fires
    shared.fail("device unplugged".to_string());
    shared.fail("device unplugged".to_string());
    shared.report();

    // Then: One NotLoaded with the message, nothing after it
    let event = rx.try_recv().unwrap();
    assert!(matches!(
        event,
        HardwareEvent::Playback {
            generation: 7,
            status: PlaybackStatus::NotLoaded { error: Some(ref message) },
        } if message == "device unplugged"
    ));
    assert!(rx.try_recv().is_err());
    assert!(shared.has_failed());
    assert!(!shared.player().status().should_play);
}
