//! Rate-paced request sender
//!
//! Sends `round(rate * duration)` requests, request `i` no earlier than
//! `floor(i * 1e6 / rate)` microseconds after the run started. Once all
//! requests are out the outbound channel is closed (with linger) and the
//! sender polls the correlation store until every request has a reply or the
//! drain window expires.

use crate::correlation::CorrelationStore;
use crate::timing::{request_count, Pacer};
use crate::workload::RequestGenerator;
use crate::{Error, FrameSink, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Configuration for a sender run
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Target rate in requests per second
    pub rate: f64,
    /// Length of the send phase
    pub duration: Duration,
    /// Upper bound on the wait for in-flight replies after the last send
    pub drain_timeout: Duration,
    /// Interval between pending checks while draining
    pub drain_poll: Duration,
}

impl SenderConfig {
    pub fn new(rate: f64, duration: Duration) -> Self {
        Self {
            rate,
            duration,
            drain_timeout: Duration::from_secs(10),
            drain_poll: Duration::from_millis(100),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.rate.is_finite() && self.rate > 0.0) {
            return Err(Error::Config(format!("rate must be > 0, got {}", self.rate)));
        }
        if self.duration.is_zero() {
            return Err(Error::Config("duration must be > 0".to_string()));
        }
        if self.drain_poll.is_zero() {
            return Err(Error::Config("drain poll interval must be > 0".to_string()));
        }
        let total = request_count(self.rate, self.duration);
        if total > u64::from(u32::MAX) {
            return Err(Error::Config(format!(
                "{total} requests exceed the 32-bit correlation id space"
            )));
        }
        Ok(())
    }
}

/// Outcome of a sender run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SendSummary {
    /// Requests put on the wire
    pub sent: u64,
    /// Wall-clock time from the first scheduling decision to the end of drain
    pub elapsed: Duration,
    /// Time spent in the drain phase
    pub drain_elapsed: Duration,
    /// Whether every request had a reply before the drain window closed
    pub drained: bool,
}

/// Paced request loop
pub struct Sender<S: FrameSink> {
    sink: S,
    store: Arc<CorrelationStore>,
    generator: RequestGenerator,
    config: SenderConfig,
}

impl<S: FrameSink> Sender<S> {
    pub fn new(
        sink: S,
        store: Arc<CorrelationStore>,
        generator: RequestGenerator,
        config: SenderConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self { sink, store, generator, config })
    }

    /// Run the send and drain phases
    ///
    /// A failed send aborts the run; sends are never retried.
    pub fn run(&mut self) -> Result<SendSummary> {
        let total = request_count(self.config.rate, self.config.duration);
        let pacer = Pacer::new(self.config.rate);

        tracing::info!(
            "Sending {} requests at {} req/s over {:?}",
            total,
            self.config.rate,
            self.config.duration
        );

        let started = Instant::now();
        let progress_every = (self.config.rate.ceil() as u64).max(1);
        let mut lagging = 0u64;

        for index in 0..total {
            if pacer.wait_for(index, started).is_zero() && index > 0 {
                lagging += 1;
            }

            let request = self.generator.next_request()?;
            // Recorded first so a fast reply always finds its request
            self.store.record_sent(request.id, Instant::now())?;
            if let Err(e) = request.with_frames(|frames| self.sink.send(frames)) {
                self.store.retract_sent(request.id);
                return Err(e.into());
            }

            if (index + 1) % progress_every == 0 {
                let counts = self.store.counts();
                tracing::debug!(
                    "Progress: sent={} received={} pending={}",
                    counts.sent,
                    counts.received,
                    counts.pending
                );
            }
        }

        let send_elapsed = started.elapsed();
        if lagging > 0 {
            tracing::debug!("{} requests were sent behind schedule", lagging);
        }
        tracing::info!("All {} requests sent in {:?}", total, send_elapsed);

        self.sink.close()?;

        let drain_started = Instant::now();
        let drained = self.drain();
        let drain_elapsed = drain_started.elapsed();

        let counts = self.store.counts();
        if drained {
            tracing::info!("All replies received after {:?} of drain", drain_elapsed);
        } else {
            tracing::warn!(
                "Drain window of {:?} expired with {} requests pending",
                self.config.drain_timeout,
                counts.pending
            );
        }

        Ok(SendSummary {
            sent: counts.sent,
            elapsed: started.elapsed(),
            drain_elapsed,
            drained,
        })
    }

    /// Poll until nothing is pending or the drain window expires
    fn drain(&self) -> bool {
        let deadline = Instant::now() + self.config.drain_timeout;
        loop {
            if self.store.pending() == 0 {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            std::thread::sleep(self.config.drain_poll.min(deadline - now));
        }
    }

    /// Give back the channel once the run is over
    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Request;
    use crate::workload::PayloadPool;
    use phloem_transport::memory_channel;
    use phloem_transport::FrameSource;

    fn generator() -> RequestGenerator {
        let pool = PayloadPool::new(
            vec!["alpha.test".into(), "beta.test".into()],
            vec!["198.51.100.1".into(), "198.51.100.2".into()],
        )
        .unwrap();
        RequestGenerator::new(pool, Some(42))
    }

    fn quick_config(rate: f64, duration: Duration) -> SenderConfig {
        SenderConfig {
            drain_timeout: Duration::from_millis(200),
            drain_poll: Duration::from_millis(20),
            ..SenderConfig::new(rate, duration)
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(SenderConfig::new(0.0, Duration::from_secs(1)).validate().is_err());
        assert!(SenderConfig::new(-5.0, Duration::from_secs(1)).validate().is_err());
        assert!(SenderConfig::new(f64::NAN, Duration::from_secs(1)).validate().is_err());
        assert!(SenderConfig::new(10.0, Duration::ZERO).validate().is_err());
        assert!(SenderConfig::new(10.0, Duration::from_secs(1)).validate().is_ok());
    }

    #[test]
    fn test_sends_expected_count_with_sequential_ids() {
        let (sink, mut source) = memory_channel(Duration::from_millis(5));
        let store = Arc::new(CorrelationStore::new());
        let mut sender = Sender::new(
            sink,
            store.clone(),
            generator(),
            quick_config(10.0, Duration::from_millis(500)),
        )
        .unwrap();

        let summary = sender.run().unwrap();
        assert_eq!(summary.sent, 5);
        assert!(!summary.drained);

        let mut ids = Vec::new();
        while let Some(frames) = source.recv().unwrap() {
            ids.push(Request::decode(&frames).unwrap().id);
        }
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(store.counts().pending, 5);
    }

    #[test]
    fn test_send_after_closed_channel_fails() {
        let (mut sink, _source) = memory_channel(Duration::from_millis(5));
        sink.close().unwrap();
        let store = Arc::new(CorrelationStore::new());
        let mut sender =
            Sender::new(sink, store.clone(), generator(), quick_config(100.0, Duration::from_millis(50)))
                .unwrap();

        assert!(sender.run().is_err());
        assert_eq!(store.counts().sent, 0);
    }

    #[test]
    fn test_sink_closed_after_run() {
        let (sink, _source) = memory_channel(Duration::from_millis(5));
        let store = Arc::new(CorrelationStore::new());
        let mut sender =
            Sender::new(sink, store, generator(), quick_config(50.0, Duration::from_millis(40)))
                .unwrap();
        assert_eq!(sender.run().unwrap().sent, 2);

        let mut sink = sender.into_sink();
        assert!(matches!(sink.send(&[b"late"]), Err(phloem_transport::Error::Closed)));
    }

    #[test]
    fn test_drain_returns_early_when_nothing_pending() {
        let (sink, _source) = memory_channel(Duration::from_millis(5));
        let store = Arc::new(CorrelationStore::new());
        let config = SenderConfig {
            drain_timeout: Duration::from_secs(10),
            ..quick_config(20.0, Duration::from_millis(100))
        };
        let sender = Sender::new(sink, store.clone(), generator(), config).unwrap();

        let started = Instant::now();
        assert!(sender.drain());
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
