//! Run orchestration
//!
//! Wires one benchmark run together: an empty correlation store shared by a
//! receiver thread and the sender on the calling thread, followed by the
//! report once the drain phase is over.

use crate::correlation::CorrelationStore;
use crate::receiver::{Receiver, ReceiverSummary};
use crate::sender::{SendSummary, Sender, SenderConfig};
use crate::stats::LatencyReport;
use crate::timing::request_count;
use crate::workload::{PayloadPool, RequestGenerator};
use crate::{FrameSink, FrameSource, Result};
use std::sync::Arc;
use std::time::Duration;

/// Parameters of a single run
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Target requests per second
    pub rate: f64,
    /// Send phase length
    pub duration: Duration,
    pub drain_timeout: Duration,
    pub drain_poll: Duration,
    /// Master seed for payload selection (entropy when absent)
    pub seed: Option<u64>,
}

impl BenchmarkConfig {
    pub fn new(rate: f64, duration: Duration) -> Self {
        let defaults = SenderConfig::new(rate, duration);
        Self {
            rate,
            duration,
            drain_timeout: defaults.drain_timeout,
            drain_poll: defaults.drain_poll,
            seed: None,
        }
    }

    fn sender_config(&self) -> SenderConfig {
        SenderConfig {
            rate: self.rate,
            duration: self.duration,
            drain_timeout: self.drain_timeout,
            drain_poll: self.drain_poll,
        }
    }
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: LatencyReport,
    pub send: SendSummary,
    pub receiver: ReceiverSummary,
}

/// Run one benchmark over already-bound channels
///
/// The receiver starts before the first request is sent and is stopped only
/// after the drain phase, so late replies inside the drain window are still
/// recorded.
pub fn run_benchmark<K, S>(
    config: &BenchmarkConfig,
    pool: PayloadPool,
    sink: K,
    source: S,
) -> Result<RunOutcome>
where
    K: FrameSink,
    S: FrameSource + 'static,
{
    let sender_config = config.sender_config();
    sender_config.validate()?;

    let expected = request_count(config.rate, config.duration);
    let store = Arc::new(CorrelationStore::with_capacity(expected as usize));

    let receiver = Receiver::new(source, store.clone()).spawn()?;

    let generator = RequestGenerator::new(pool, config.seed);
    let send_result =
        Sender::new(sink, store.clone(), generator, sender_config).and_then(|mut s| s.run());

    // Stop the receiver even when sending failed so its thread never leaks
    let receiver_result = receiver.stop();
    let send = send_result?;
    let receiver = receiver_result?;

    let report = LatencyReport::from_store(&store, send.elapsed);
    tracing::info!(
        "Run finished: sent={} received={} completed={} timed_out={}",
        report.sent,
        report.received,
        report.completed,
        report.timed_out
    );

    Ok(RunOutcome { report, send, receiver })
}
