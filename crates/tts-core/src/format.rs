//! Display helpers shared by the panel and tray surfaces.

use crate::Tick;

/// Panel clock: zero-padded `HH:MM:SS` (hours grow past two digits).
#[must_use]
pub fn format_clock(seconds: u64) -> String {
    let (hours, minutes, secs) = split(seconds);
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Tray clock: `H:MM:SS` when at least an hour remains, otherwise `M:SS`.
#[must_use]
pub fn format_compact(seconds: u64) -> String {
    let (hours, minutes, secs) = split(seconds);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// Multi-line tray tooltip for a running timer.
///
/// The target is appended to the action line unless it is empty or the
/// generic "System".
#[must_use]
pub fn tooltip(tick: Tick, status: &str, action: &str, target: &str) -> String {
    let mut text = format!(
        "Percentage: {}%\nTime Left: {}\nStatus: {status}\nAction: {action}",
        tick.percent(),
        format_compact(tick.remaining),
    );
    if !target.is_empty() && target != "System" {
        text.push_str(&format!(" ({target})"));
    }
    text
}

fn split(seconds: u64) -> (u64, u64, u64) {
    (seconds / 3600, (seconds % 3600) / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "00:00:00");
        assert_eq!(format_clock(3661), "01:01:01");
        assert_eq!(format_clock(998 * 3600 + 59 * 60 + 59), "998:59:59");
    }

    #[test]
    fn test_format_compact() {
        assert_eq!(format_compact(5), "0:05");
        assert_eq!(format_compact(125), "2:05");
        assert_eq!(format_compact(3600), "1:00:00");
    }

    #[test]
    fn test_tooltip_with_target() {
        let text = tooltip(Tick::new(30, 60), "Running", "Terminate Process", "firefox");
        assert_eq!(
            text,
            "Percentage: 50%\nTime Left: 0:30\nStatus: Running\nAction: Terminate Process (firefox)"
        );
    }

    #[test]
    fn test_tooltip_system_target_omitted() {
        let text = tooltip(Tick::new(3600, 7200), "Paused", "Shutdown", "System");
        assert!(text.ends_with("Action: Shutdown"));
        assert!(text.contains("Time Left: 1:00:00"));
    }
}
