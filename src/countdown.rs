//! Lock-period clock.
//!
//! Pure derivation of a day/hour/minute/second breakdown from a target (or
//! origin) timestamp. The all-zero countdown state used to be ambiguous
//! between "not started" and "completed"; the explicit `finished` flag
//! disambiguates a reached deadline.

/// Count toward a deadline, or up from an origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockMode {
    /// Remaining time until `anchor`; clamps at zero once reached.
    CountDown,
    /// Elapsed time since `anchor`; keeps counting past any threshold.
    CountUp,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeParts {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    /// Only meaningful in count-down mode: the deadline has been reached.
    pub finished: bool,
}

impl TimeParts {
    pub fn is_zero(&self) -> bool {
        self.days == 0 && self.hours == 0 && self.minutes == 0 && self.seconds == 0
    }
}

/// Break the distance between `now` and `anchor` (both unix seconds) into
/// whole days plus remainders.
pub fn breakdown(now: u64, anchor: u64, mode: ClockMode) -> TimeParts {
    let elapsed = match mode {
        ClockMode::CountDown => {
            if anchor <= now {
                return TimeParts {
                    finished: true,
                    ..TimeParts::default()
                };
            }
            anchor - now
        }
        ClockMode::CountUp => {
            if now <= anchor {
                return TimeParts::default();
            }
            now - anchor
        }
    };

    TimeParts {
        days: elapsed / 86_400,
        hours: (elapsed / 3_600) % 24,
        minutes: (elapsed / 60) % 60,
        seconds: elapsed % 60,
        finished: false,
    }
}

/// Compact `1d 01:02:03` rendering for the watch view.
pub fn format_parts(parts: &TimeParts) -> String {
    if parts.days > 0 {
        format!(
            "{}d {:02}:{:02}:{:02}",
            parts.days, parts.hours, parts.minutes, parts.seconds
        )
    } else {
        format!("{:02}:{:02}:{:02}", parts.hours, parts.minutes, parts.seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_countdown_reached_deadline() {
        let parts = breakdown(1_000_000, 1_000_000, ClockMode::CountDown);
        assert!(parts.is_zero());
        assert!(parts.finished);

        let past = breakdown(1_000_100, 1_000_000, ClockMode::CountDown);
        assert!(past.is_zero());
        assert!(past.finished);
    }

    #[test]
    fn test_countdown_one_day_one_hour() {
        // 90000 s = 1 day, 1 hour
        let parts = breakdown(1_000_000, 1_000_000 + 90_000, ClockMode::CountDown);
        assert_eq!(parts.days, 1);
        assert_eq!(parts.hours, 1);
        assert_eq!(parts.minutes, 0);
        assert_eq!(parts.seconds, 0);
        assert!(!parts.finished);
    }

    #[test]
    fn test_countdown_remainders() {
        let parts = breakdown(0, 86_400 + 3_600 * 2 + 60 * 3 + 4, ClockMode::CountDown);
        assert_eq!(
            (parts.days, parts.hours, parts.minutes, parts.seconds),
            (1, 2, 3, 4)
        );
    }

    #[test]
    fn test_count_up_keeps_counting() {
        let parts = breakdown(1_000_000 + 200_000, 1_000_000, ClockMode::CountUp);
        assert_eq!(parts.days, 2);
        assert!(!parts.finished);
    }

    #[test]
    fn test_count_up_future_origin_is_zero() {
        let parts = breakdown(1_000_000, 1_000_500, ClockMode::CountUp);
        assert!(parts.is_zero());
        assert!(!parts.finished);
    }

    #[test]
    fn test_format() {
        let parts = breakdown(0, 90_000, ClockMode::CountDown);
        assert_eq!(format_parts(&parts), "1d 01:00:00");
        let short = breakdown(0, 65, ClockMode::CountDown);
        assert_eq!(format_parts(&short), "00:01:05");
    }
}
