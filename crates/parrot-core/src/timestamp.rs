//! `MM:SS` rendering of millisecond durations.

/// Formats a duration in milliseconds as `MM:SS`.
///
/// Minutes are not wrapped into hours, so an hour and a minute renders as
/// `61:01`. Values below ten are zero-padded to two digits.
pub fn format_mmss(millis: u64) -> String {
    let total_seconds = millis / 1000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;

    format!("{:02}:{:02}", minutes, seconds)
}

/// Formats `position / duration` for the playback readout.
///
/// Returns an empty string when either value is unknown.
pub fn format_progress(position_ms: Option<u64>, duration_ms: Option<u64>) -> String {
    match (position_ms, duration_ms) {
        (Some(position), Some(duration)) => {
            format!("{} / {}", format_mmss(position), format_mmss(duration))
        }
        _ => String::new(),
    }
}
