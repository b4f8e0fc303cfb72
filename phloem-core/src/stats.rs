//! Latency statistics
//!
//! Runs once after the drain phase: collects `end - start` for every
//! completed request, sorts ascending and reads off nearest-rank
//! percentiles. Requests still pending are counted as timed out and left out
//! of the latency sample.

use crate::correlation::CorrelationStore;
use crate::timing::latency_us;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reported percentile latencies in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    pub max: f64,
    pub p999: f64,
    pub p99: f64,
    pub p90: f64,
}

impl Percentiles {
    /// Compute from latencies in microseconds, sorted ascending
    ///
    /// Returns `None` when there is nothing to report.
    pub fn from_sorted(sorted_us: &[u64]) -> Option<Self> {
        Some(Self {
            max: percentile(sorted_us, 1.0)?,
            p999: percentile(sorted_us, 0.999)?,
            p99: percentile(sorted_us, 0.99)?,
            p90: percentile(sorted_us, 0.90)?,
        })
    }
}

/// Nearest-rank percentile of sorted microsecond latencies, in milliseconds
///
/// The index is `round(p * n) - 1` clamped to `[0, n - 1]`. Returns `None`
/// for an empty sample.
///
/// # Example
/// ```
/// use phloem_core::stats::percentile;
///
/// let sorted = [1_000, 2_000, 3_000, 4_000];
/// assert_eq!(percentile(&sorted, 0.5), Some(2.0));
/// assert_eq!(percentile(&sorted, 1.0), Some(4.0));
/// assert_eq!(percentile(&[], 0.99), None);
/// ```
pub fn percentile(sorted_us: &[u64], p: f64) -> Option<f64> {
    let n = sorted_us.len();
    if n == 0 {
        return None;
    }
    let rank = (p * n as f64).round() as i64 - 1;
    let index = rank.clamp(0, n as i64 - 1) as usize;
    Some(sorted_us[index] as f64 / 1000.0)
}

/// Latencies of all completed requests in microseconds, sorted ascending
pub fn completed_latencies(store: &CorrelationStore) -> Vec<u64> {
    let mut latencies: Vec<u64> = store
        .snapshot()
        .iter()
        .filter_map(|record| record.end.map(|end| latency_us(record.start, end)))
        .collect();
    latencies.sort_unstable();
    latencies
}

/// Final report of a benchmark run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyReport {
    pub sent: u64,
    pub received: u64,
    /// Requests with a matched reply
    pub completed: u64,
    /// Requests still without a reply when the drain window closed
    pub timed_out: u64,
    /// Replies for ids that were never sent
    pub unmatched: u64,
    pub duration_secs: f64,
    /// `None` when no request completed
    pub percentiles: Option<Percentiles>,
    pub min_ms: Option<f64>,
    pub mean_ms: Option<f64>,
}

impl LatencyReport {
    /// Build the report from a drained store
    ///
    /// The store is only read.
    pub fn from_store(store: &CorrelationStore, duration: Duration) -> Self {
        let counts = store.counts();
        let latencies = completed_latencies(store);

        let min_ms = latencies.first().map(|&us| us as f64 / 1000.0);
        let mean_ms = if latencies.is_empty() {
            None
        } else {
            let sum: u128 = latencies.iter().map(|&us| u128::from(us)).sum();
            Some(sum as f64 / latencies.len() as f64 / 1000.0)
        };

        Self {
            sent: counts.sent,
            received: counts.received,
            completed: latencies.len() as u64,
            timed_out: counts.pending,
            unmatched: counts.unmatched,
            duration_secs: duration.as_secs_f64(),
            percentiles: Percentiles::from_sorted(&latencies),
            min_ms,
            mean_ms,
        }
    }

    /// Observed request rate over the whole run
    pub fn throughput_rps(&self) -> f64 {
        if self.duration_secs > 0.0 {
            self.sent as f64 / self.duration_secs
        } else {
            0.0
        }
    }

    pub fn has_data(&self) -> bool {
        self.percentiles.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_percentile_index_rule() {
        let sorted: Vec<u64> = (1..=1000).map(|ms| ms * 1000).collect();
        assert_eq!(percentile(&sorted, 1.0), Some(1000.0));
        assert_eq!(percentile(&sorted, 0.999), Some(999.0));
        assert_eq!(percentile(&sorted, 0.99), Some(990.0));
        assert_eq!(percentile(&sorted, 0.90), Some(900.0));
    }

    #[test]
    fn test_percentile_clamps_small_samples() {
        let sorted = [1_500u64, 2_500];
        // round(0.1 * 2) - 1 = -1 -> clamped to 0
        assert_eq!(percentile(&sorted, 0.1), Some(1.5));
        assert_eq!(percentile(&sorted, 0.9), Some(2.5));
        assert_eq!(percentile(&sorted, 0.0), Some(1.5));
    }

    #[test]
    fn test_percentile_empty_is_none() {
        assert_eq!(percentile(&[], 1.0), None);
        assert_eq!(Percentiles::from_sorted(&[]), None);
    }

    #[test]
    fn test_single_latency_fills_every_percentile() {
        let p = Percentiles::from_sorted(&[4_321]).unwrap();
        assert_eq!(p, Percentiles { max: 4.321, p999: 4.321, p99: 4.321, p90: 4.321 });
    }

    #[test]
    fn test_percentiles_ordered() {
        let mut sorted: Vec<u64> = (0..537).map(|i| (i * 7919) % 10_007).collect();
        sorted.sort_unstable();
        let p = Percentiles::from_sorted(&sorted).unwrap();
        assert!(p.p90 <= p.p99);
        assert!(p.p99 <= p.p999);
        assert!(p.p999 <= p.max);
    }

    #[test]
    fn test_report_ignores_pending_requests() {
        let store = CorrelationStore::new();
        let t0 = Instant::now();
        store.record_sent(1, t0).unwrap();
        store.record_sent(2, t0).unwrap();
        store.record_sent(3, t0).unwrap();
        store.record_reply(1, t0 + Duration::from_micros(2_000));
        store.record_reply(3, t0 + Duration::from_micros(6_000));
        store.record_reply(42, t0 + Duration::from_micros(1));

        let report = LatencyReport::from_store(&store, Duration::from_secs(2));
        assert_eq!(report.sent, 3);
        assert_eq!(report.received, 3);
        assert_eq!(report.completed, 2);
        assert_eq!(report.timed_out, 1);
        assert_eq!(report.unmatched, 1);
        assert_eq!(report.min_ms, Some(2.0));
        assert_eq!(report.mean_ms, Some(4.0));
        assert_eq!(report.percentiles.unwrap().max, 6.0);
        assert_eq!(report.throughput_rps(), 1.5);
    }

    #[test]
    fn test_report_without_replies_has_no_data() {
        let store = CorrelationStore::new();
        store.record_sent(1, Instant::now()).unwrap();

        let report = LatencyReport::from_store(&store, Duration::from_secs(1));
        assert!(!report.has_data());
        assert_eq!(report.completed, 0);
        assert_eq!(report.timed_out, 1);
        assert_eq!(report.mean_ms, None);
    }
}
