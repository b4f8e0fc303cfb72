//! Reply receiver
//!
//! Pulls replies on a dedicated thread so the sender's pacing sleeps never
//! delay reply timestamps. The loop keeps listening until the orchestrator
//! stops it; it notices the stop request within one idle receive timeout.

use crate::correlation::{CorrelationStore, ReplyOutcome};
use crate::request::Reply;
use crate::{Error, FrameSource, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Tally of what the receiver consumed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverSummary {
    /// Well-formed replies decoded
    pub replies: u64,
    pub matched: u64,
    /// Replies for ids that were never sent
    pub unmatched: u64,
    pub duplicates: u64,
    /// Messages that could not be decoded and were skipped
    pub malformed: u64,
}

/// Reply ingestion loop
pub struct Receiver<S: FrameSource> {
    source: S,
    store: Arc<CorrelationStore>,
    stop: Arc<AtomicBool>,
    summary: ReceiverSummary,
}

impl<S: FrameSource> Receiver<S> {
    pub fn new(source: S, store: Arc<CorrelationStore>) -> Self {
        Self { source, store, stop: Arc::new(AtomicBool::new(false)), summary: Default::default() }
    }

    /// Flag that ends `run` when set
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Process one inbound message
    ///
    /// Malformed messages are logged and skipped.
    pub fn handle(&mut self, frames: &[Vec<u8>], at: Instant) -> Option<ReplyOutcome> {
        let reply = match Reply::decode(frames) {
            Ok(reply) => reply,
            Err(e) => {
                self.summary.malformed += 1;
                tracing::warn!("Skipping malformed reply: {}", e);
                return None;
            }
        };

        self.summary.replies += 1;
        let outcome = self.store.record_reply(reply.id, at);
        match outcome {
            ReplyOutcome::Matched => self.summary.matched += 1,
            ReplyOutcome::Unknown => {
                self.summary.unmatched += 1;
                tracing::debug!("Reply for unknown request id {}", reply.id);
            }
            ReplyOutcome::Duplicate => {
                self.summary.duplicates += 1;
                tracing::debug!("Duplicate reply for request id {}", reply.id);
            }
        }
        Some(outcome)
    }

    /// Receive until the stop flag is set
    ///
    /// Channel errors other than an idle timeout end the loop.
    pub fn run(&mut self) -> Result<ReceiverSummary> {
        while !self.stop.load(Ordering::Acquire) {
            if let Some(frames) = self.source.recv()? {
                let at = Instant::now();
                self.handle(&frames, at);
            }
        }
        tracing::debug!("Receiver stopped: {:?}", self.summary);
        Ok(self.summary)
    }

    pub fn summary(&self) -> ReceiverSummary {
        self.summary
    }
}

impl<S: FrameSource + 'static> Receiver<S> {
    /// Run the receiver on its own thread
    pub fn spawn(mut self) -> Result<ReceiverHandle> {
        let stop = self.stop_flag();
        let handle = thread::Builder::new()
            .name("phloem-receiver".to_string())
            .spawn(move || self.run())?;
        Ok(ReceiverHandle { stop, handle })
    }
}

/// Handle to a receiver running on its own thread
pub struct ReceiverHandle {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<Result<ReceiverSummary>>,
}

impl ReceiverHandle {
    /// Ask the receiver to stop and wait for it
    pub fn stop(self) -> Result<ReceiverSummary> {
        self.stop.store(true, Ordering::Release);
        self.handle
            .join()
            .map_err(|e| Error::Other(format!("Receiver thread panicked: {e:?}")))?
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
