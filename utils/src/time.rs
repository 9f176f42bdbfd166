//! Wall clock and time formatting helpers.

use hopestream_types::{Clock, Timestamp};

/// The host's wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Format a duration in seconds to a human-readable string.
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_pick_largest_units() {
        assert_eq!(format_duration(59), "59s");
        assert_eq!(format_duration(3_599), "59m 59s");
        assert_eq!(format_duration(3_600), "1h 0m");
        // Default anti-Sybil cooldown and voting period.
        assert_eq!(format_duration(3_600 + 1_800), "1h 30m");
        assert_eq!(format_duration(7 * 86_400), "7d 0h");
        assert_eq!(format_duration(30 * 86_400 + 7_200), "30d 2h");
    }

    #[test]
    fn system_clock_is_past_epoch() {
        assert!(SystemClock.now() > Timestamp::EPOCH);
    }
}
