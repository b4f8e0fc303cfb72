//! Monotonic timing and rate pacing
//!
//! All timestamps come from `std::time::Instant`. Latencies are reported in
//! whole microseconds, truncating any sub-microsecond remainder.

use std::time::{Duration, Instant};

/// Latency between two monotonic timestamps in whole microseconds
///
/// Computed as the seconds difference times 1,000,000 plus the sub-second
/// microseconds, floor-truncated. Returns 0 if `end` precedes `start`.
///
/// # Example
/// ```
/// use phloem_core::timing::latency_us;
/// use std::time::{Duration, Instant};
///
/// let start = Instant::now();
/// let end = start + Duration::from_nanos(1_500_999);
/// assert_eq!(latency_us(start, end), 1_500);
/// ```
#[inline]
pub fn latency_us(start: Instant, end: Instant) -> u64 {
    let elapsed = end.saturating_duration_since(start);
    elapsed.as_secs() * 1_000_000 + u64::from(elapsed.subsec_micros())
}

/// Number of requests a run of `duration` at `rate` requests per second sends
///
/// `round(rate * duration_secs)`
pub fn request_count(rate: f64, duration: Duration) -> u64 {
    (rate * duration.as_secs_f64()).round() as u64
}

/// Schedule-from-start pacing
///
/// Request `i` is due `floor(i * 1_000_000 / rate)` microseconds after the
/// run started. Deriving every deadline from the start instead of from the
/// previous send means a transient stall is caught up rather than
/// accumulated.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    rate: f64,
}

impl Pacer {
    /// Create a pacer for `rate` requests per second (must be > 0)
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }

    /// Scheduled offset of request `index` (0-based) from the run start
    pub fn scheduled_offset(&self, index: u64) -> Duration {
        let micros = (index as f64 * 1_000_000.0 / self.rate).floor() as u64;
        Duration::from_micros(micros)
    }

    /// Block until request `index` is due
    ///
    /// Sleeps for the remaining time when ahead of schedule and returns
    /// immediately when behind. Returns how long the caller was suspended.
    pub fn wait_for(&self, index: u64, started: Instant) -> Duration {
        let scheduled = self.scheduled_offset(index);
        let elapsed = started.elapsed();
        if elapsed < scheduled {
            let delay = scheduled - elapsed;
            std::thread::sleep(delay);
            delay
        } else {
            Duration::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_us_truncates_sub_microsecond() {
        let start = Instant::now();
        assert_eq!(latency_us(start, start), 0);
        assert_eq!(latency_us(start, start + Duration::from_nanos(999)), 0);
        assert_eq!(latency_us(start, start + Duration::from_millis(2_003)), 2_003_000);
        assert_eq!(latency_us(start, start + Duration::new(3, 250_750)), 3_000_250);
    }

    #[test]
    fn test_latency_us_saturates_when_reversed() {
        let start = Instant::now();
        let later = start + Duration::from_millis(5);
        assert_eq!(latency_us(later, start), 0);
    }

    #[test]
    fn test_request_count_rounds() {
        assert_eq!(request_count(10.0, Duration::from_millis(500)), 5);
        assert_eq!(request_count(100.0, Duration::from_secs(3)), 300);
        assert_eq!(request_count(3.0, Duration::from_millis(500)), 2); // 1.5 rounds up
        assert_eq!(request_count(1.0, Duration::from_millis(400)), 0);
    }

    #[test]
    fn test_scheduled_offsets_floor() {
        let pacer = Pacer::new(100.0);
        assert_eq!(pacer.scheduled_offset(0), Duration::ZERO);
        assert_eq!(pacer.scheduled_offset(1), Duration::from_millis(10));
        assert_eq!(pacer.scheduled_offset(250), Duration::from_millis(2_500));

        let pacer = Pacer::new(3.0);
        assert_eq!(pacer.scheduled_offset(1), Duration::from_micros(333_333));
        assert_eq!(pacer.scheduled_offset(2), Duration::from_micros(666_666));
    }

    #[test]
    fn test_wait_for_sleeps_until_due() {
        let pacer = Pacer::new(50.0); // 20ms spacing
        let started = Instant::now();

        pacer.wait_for(3, started);
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn test_wait_for_behind_schedule_returns_immediately() {
        let pacer = Pacer::new(1_000.0);
        let started = Instant::now() - Duration::from_secs(1);

        assert_eq!(pacer.wait_for(10, started), Duration::ZERO);
    }
}
