//! Shared helpers for the in-process harness tests

#![allow(dead_code)]

use phloem_core::{PayloadPool, Reply, Request};
use phloem_transport::{FrameSink, FrameSource, Frames, MemorySink, MemorySource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub fn test_pool() -> PayloadPool {
    PayloadPool::new(
        vec!["shop.example".into(), "news.example".into(), "mail.example".into()],
        vec!["203.0.113.5".into(), "203.0.113.9".into()],
    )
    .unwrap()
}

/// Reply channel that fails on every receive
pub struct FailingSource;

impl FrameSource for FailingSource {
    fn recv(&mut self) -> phloem_transport::Result<Option<Frames>> {
        Err(phloem_transport::Error::Other("reply socket lost".to_string()))
    }
}

/// In-process stand-in for the decision endpoint
pub struct Loopback {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<u64>,
}

impl Loopback {
    /// Answer every request after `delay`; `reply_for` maps a request to the
    /// id to answer with (`None` = drop the request)
    pub fn start<F>(
        mut requests: MemorySource,
        mut replies: MemorySink,
        delay: Duration,
        reply_for: F,
    ) -> Self
    where
        F: Fn(&Request) -> Option<u32> + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let handle = thread::spawn(move || {
            let mut answered = 0;
            while !flag.load(Ordering::Acquire) {
                let Some(frames) = requests.recv().unwrap() else { continue };
                let request = Request::decode(&frames).unwrap();
                let Some(id) = reply_for(&request) else { continue };
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
                let reply = Reply { id, score: b"0.42".to_vec(), category: b"benign".to_vec() };
                if reply.with_frames(|f| replies.send(f)).is_ok() {
                    answered += 1;
                }
            }
            answered
        });
        Self { stop, handle }
    }

    pub fn echo(requests: MemorySource, replies: MemorySink, delay: Duration) -> Self {
        Self::start(requests, replies, delay, |request| Some(request.id))
    }

    /// Stop and return how many replies were sent
    pub fn stop(self) -> u64 {
        self.stop.store(true, Ordering::Release);
        self.handle.join().unwrap()
    }
}
