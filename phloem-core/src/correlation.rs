//! Request/reply correlation store
//!
//! The sender records a start time per request id and the receiver records the
//! matching end time. Both run on their own threads, so every read and write
//! goes through a single mutex. Share the store with `Arc<CorrelationStore>`.
//!
//! Accounting rules:
//! - `sent` counts recorded requests, `completed` counts requests that have an
//!   end time, and `pending = sent - completed` can never go negative.
//! - `received` counts every decoded reply, including replies for ids that
//!   were never sent (`unmatched`) and repeated replies (`duplicates`).
//!   Neither kind creates or modifies a record.

use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

/// Timestamps for a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationRecord {
    pub id: u32,
    pub start: Instant,
    /// Set once the reply arrives; absent for requests that timed out
    pub end: Option<Instant>,
}

impl CorrelationRecord {
    pub fn is_completed(&self) -> bool {
        self.end.is_some()
    }
}

/// What a reply did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// First reply for a known request; its end time was recorded
    Matched,
    /// No request with this id was sent; nothing was recorded
    Unknown,
    /// The request already had a reply; the first end time is kept
    Duplicate,
}

/// Point-in-time counter values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub sent: u64,
    pub received: u64,
    pub completed: u64,
    pub pending: u64,
    pub unmatched: u64,
    pub duplicates: u64,
}

#[derive(Default)]
struct Inner {
    records: HashMap<u32, CorrelationRecord>,
    sent: u64,
    received: u64,
    completed: u64,
    unmatched: u64,
    duplicates: u64,
}

/// Shared mapping from request id to its timestamps
#[derive(Default)]
pub struct CorrelationStore {
    inner: Mutex<Inner>,
}

impl CorrelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-sized for `expected` requests
    pub fn with_capacity(expected: usize) -> Self {
        Self {
            inner: Mutex::new(Inner { records: HashMap::with_capacity(expected), ..Inner::default() }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking holder cannot leave the counters half-updated, so the
        // data behind a poisoned lock is still consistent.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record that request `id` was put on the wire at `at`
    ///
    /// Ids are unique for a run; recording the same id twice is an error.
    pub fn record_sent(&self, id: u32, at: Instant) -> Result<()> {
        let mut inner = self.lock();
        if inner.records.contains_key(&id) {
            return Err(Error::Other(format!("request id {id} recorded twice")));
        }
        inner.records.insert(id, CorrelationRecord { id, start: at, end: None });
        inner.sent += 1;
        Ok(())
    }

    /// Undo `record_sent` for a request that never made it onto the wire
    ///
    /// Returns false if the id is unknown or already has a reply.
    pub fn retract_sent(&self, id: u32) -> bool {
        let mut inner = self.lock();
        match inner.records.get(&id) {
            Some(record) if !record.is_completed() => {
                inner.records.remove(&id);
                inner.sent -= 1;
                true
            }
            _ => false,
        }
    }

    /// Record a reply for `id` arriving at `at`
    pub fn record_reply(&self, id: u32, at: Instant) -> ReplyOutcome {
        let mut inner = self.lock();
        inner.received += 1;

        let outcome = match inner.records.get_mut(&id) {
            None => ReplyOutcome::Unknown,
            Some(record) if record.is_completed() => ReplyOutcome::Duplicate,
            Some(record) => {
                // Instants from different threads may be observed slightly
                // out of order; a reply never ends before its request started.
                record.end = Some(at.max(record.start));
                ReplyOutcome::Matched
            }
        };

        match outcome {
            ReplyOutcome::Matched => inner.completed += 1,
            ReplyOutcome::Unknown => inner.unmatched += 1,
            ReplyOutcome::Duplicate => inner.duplicates += 1,
        }
        outcome
    }

    pub fn counts(&self) -> Counters {
        let inner = self.lock();
        Counters {
            sent: inner.sent,
            received: inner.received,
            completed: inner.completed,
            pending: inner.sent - inner.completed,
            unmatched: inner.unmatched,
            duplicates: inner.duplicates,
        }
    }

    /// Number of sent requests still waiting for a reply
    pub fn pending(&self) -> u64 {
        let inner = self.lock();
        inner.sent - inner.completed
    }

    /// Look up a single record
    pub fn get(&self, id: u32) -> Option<CorrelationRecord> {
        self.lock().records.get(&id).copied()
    }

    /// Copy out every record, in no particular order
    pub fn snapshot(&self) -> Vec<CorrelationRecord> {
        self.lock().records.values().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_sent_then_reply_completes() {
        let store = CorrelationStore::new();
        let start = Instant::now();
        store.record_sent(1, start).unwrap();

        let counts = store.counts();
        assert_eq!((counts.sent, counts.received, counts.pending), (1, 0, 1));

        let end = start + Duration::from_millis(3);
        assert_eq!(store.record_reply(1, end), ReplyOutcome::Matched);

        let record = store.get(1).unwrap();
        assert_eq!(record.end, Some(end));
        let counts = store.counts();
        assert_eq!((counts.sent, counts.received, counts.pending), (1, 1, 0));
    }

    #[test]
    fn test_unknown_reply_counts_without_record() {
        let store = CorrelationStore::new();
        store.record_sent(1, Instant::now()).unwrap();

        assert_eq!(store.record_reply(99, Instant::now()), ReplyOutcome::Unknown);

        assert!(store.get(99).is_none());
        assert_eq!(store.snapshot().len(), 1);
        let counts = store.counts();
        assert_eq!(counts.received, 1);
        assert_eq!(counts.unmatched, 1);
        assert_eq!(counts.pending, 1);
    }

    #[test]
    fn test_duplicate_reply_keeps_first_end_time() {
        let store = CorrelationStore::new();
        let start = Instant::now();
        store.record_sent(5, start).unwrap();

        let first = start + Duration::from_millis(1);
        store.record_reply(5, first);
        assert_eq!(
            store.record_reply(5, start + Duration::from_millis(9)),
            ReplyOutcome::Duplicate
        );

        assert_eq!(store.get(5).unwrap().end, Some(first));
        let counts = store.counts();
        assert_eq!(counts.received, 2);
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.duplicates, 1);
        assert_eq!(counts.pending, 0);
    }

    #[test]
    fn test_duplicate_send_rejected() {
        let store = CorrelationStore::new();
        store.record_sent(3, Instant::now()).unwrap();
        assert!(store.record_sent(3, Instant::now()).is_err());
        assert_eq!(store.counts().sent, 1);
    }

    #[test]
    fn test_retract_only_unanswered() {
        let store = CorrelationStore::new();
        store.record_sent(1, Instant::now()).unwrap();
        store.record_sent(2, Instant::now()).unwrap();
        store.record_reply(2, Instant::now());

        assert!(store.retract_sent(1));
        assert!(!store.retract_sent(2));
        assert!(!store.retract_sent(7));
        assert!(store.get(1).is_none());
        let counts = store.counts();
        assert_eq!((counts.sent, counts.completed, counts.pending), (1, 1, 0));
    }

    #[test]
    fn test_end_never_precedes_start() {
        let store = CorrelationStore::new();
        let start = Instant::now() + Duration::from_millis(50);
        store.record_sent(1, start).unwrap();
        store.record_reply(1, Instant::now());
        let record = store.get(1).unwrap();
        assert!(record.end.unwrap() >= record.start);
    }

    #[test]
    fn test_concurrent_sender_and_receiver() {
        let store = Arc::new(CorrelationStore::with_capacity(2_000));
        let total = 2_000u32;

        let sender_store = store.clone();
        let sender = thread::spawn(move || {
            for id in 1..=total {
                sender_store.record_sent(id, Instant::now()).unwrap();
            }
        });

        let receiver_store = store.clone();
        let receiver = thread::spawn(move || {
            let mut next = 1;
            while next <= total {
                if receiver_store.get(next).is_some() {
                    receiver_store.record_reply(next, Instant::now());
                    let counts = receiver_store.counts();
                    assert_eq!(counts.pending, counts.sent - counts.received);
                    next += 1;
                } else {
                    thread::yield_now();
                }
            }
        });

        sender.join().unwrap();
        receiver.join().unwrap();

        let counts = store.counts();
        assert_eq!(counts.sent, total as u64);
        assert_eq!(counts.received, total as u64);
        assert_eq!(counts.pending, 0);
        assert!(store.snapshot().iter().all(|r| r.end.unwrap() >= r.start));
    }
}
