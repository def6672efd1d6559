//! General time utility functions

use chrono;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Number of whole cycles of `period_s` that fit into `duration_s`.
///
/// Used to turn timeouts into iteration counters. A non-positive period yields zero cycles.
pub fn seconds_to_cycles(duration_s: f64, period_s: f64) -> u64 {
    if period_s <= 0.0 || !duration_s.is_finite() {
        return 0;
    }

    (duration_s / period_s).round().max(0.0) as u64
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_seconds_to_cycles() {
        assert_eq!(seconds_to_cycles(1.0, 0.01), 100);
        assert_eq!(seconds_to_cycles(0.0, 0.01), 0);
        assert_eq!(seconds_to_cycles(1.0, 0.0), 0);
        assert_eq!(seconds_to_cycles(-1.0, 0.01), 0);
    }
}
