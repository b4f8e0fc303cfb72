//! Pacing accuracy of the sender against its schedule-from-start formula

use phloem_core::{CorrelationStore, PayloadPool, RequestGenerator, Sender, SenderConfig};
use phloem_transport::memory_channel;
use std::sync::Arc;
use std::time::Duration;

fn run_sender(rate: f64, duration: Duration) -> Arc<CorrelationStore> {
    let pool = PayloadPool::new(vec!["pace.example".into()], vec!["192.0.2.1".into()]).unwrap();
    let (sink, _source) = memory_channel(Duration::from_millis(5));
    let store = Arc::new(CorrelationStore::new());

    let config = SenderConfig {
        drain_timeout: Duration::ZERO,
        ..SenderConfig::new(rate, duration)
    };
    let mut sender =
        Sender::new(sink, store.clone(), RequestGenerator::new(pool, Some(3)), config).unwrap();
    let summary = sender.run().unwrap();
    assert_eq!(summary.sent, (rate * duration.as_secs_f64()).round() as u64);
    store
}

#[test]
fn test_requests_never_sent_ahead_of_schedule() {
    let store = run_sender(100.0, Duration::from_millis(500));

    let mut records = store.snapshot();
    records.sort_by_key(|r| r.id);
    assert_eq!(records.len(), 50);

    // Request 1 goes out at offset zero, so offsets are measured from it
    let first = records[0].start;
    let tick = Duration::from_millis(1);
    for (i, record) in records.iter().enumerate() {
        let offset = record.start.duration_since(first);
        let scheduled = Duration::from_millis(10 * i as u64);
        assert!(
            offset + tick >= scheduled,
            "request {} sent at {:?}, scheduled {:?}",
            record.id,
            offset,
            scheduled
        );
    }
}

#[test]
fn test_total_send_time_tracks_duration() {
    let store = run_sender(200.0, Duration::from_millis(300));

    let mut records = store.snapshot();
    records.sort_by_key(|r| r.id);
    let span = records.last().unwrap().start.duration_since(records[0].start);

    // Last of 60 requests is due at 295ms
    assert!(span >= Duration::from_millis(294));
    assert!(span < Duration::from_millis(600), "send phase drifted to {span:?}");
}
