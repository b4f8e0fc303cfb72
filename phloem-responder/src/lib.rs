//! Phloem Responder
//!
//! A mock decision endpoint for exercising the phloem harness without the
//! real service. It pulls `[id][domain][ip]` requests and pushes
//! `[id][score][category]` replies, optionally after a fixed service delay
//! and with a configurable fraction of requests silently dropped.

use phloem_core::request::{Reply, Request};
use phloem_core::seed::{component_rng, components};
use phloem_transport::{FrameSink, FrameSource};
use rand::rngs::SmallRng;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Categories a reply may carry
pub const CATEGORIES: [&str; 4] = ["benign", "suspicious", "malicious", "unknown"];

/// Responder behaviour
#[derive(Debug, Clone, Default)]
pub struct ResponderConfig {
    /// Fixed delay before each reply
    pub delay: Duration,
    /// Fraction of requests dropped without a reply (0.0 to 1.0)
    pub drop_rate: f64,
    pub seed: Option<u64>,
    /// Stop after this many requests
    pub max_requests: Option<u64>,
}

/// Counters for a responder run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponderStats {
    pub requests: u64,
    pub replied: u64,
    pub dropped: u64,
    pub malformed: u64,
}

/// Request/reply loop of the mock endpoint
pub struct Responder<S: FrameSource, K: FrameSink> {
    requests: S,
    replies: K,
    config: ResponderConfig,
    score_rng: SmallRng,
    drop_rng: SmallRng,
    stop: Arc<AtomicBool>,
    stats: ResponderStats,
}

impl<S: FrameSource, K: FrameSink> Responder<S, K> {
    pub fn new(requests: S, replies: K, mut config: ResponderConfig) -> Self {
        config.drop_rate = config.drop_rate.clamp(0.0, 1.0);
        Self {
            requests,
            replies,
            score_rng: component_rng(config.seed, components::RESPONDER_SCORES),
            drop_rng: component_rng(config.seed, components::RESPONDER_DROPS),
            config,
            stop: Arc::new(AtomicBool::new(false)),
            stats: ResponderStats::default(),
        }
    }

    /// Flag that ends `run` when set
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Build the reply for a request
    pub fn reply_for(&mut self, request: &Request) -> Reply {
        let score: f64 = self.score_rng.random();
        let category = CATEGORIES[self.score_rng.random_range(0..CATEGORIES.len())];
        Reply {
            id: request.id,
            score: format!("{score:.4}").into_bytes(),
            category: category.as_bytes().to_vec(),
        }
    }

    fn should_drop(&mut self) -> bool {
        self.config.drop_rate > 0.0 && self.drop_rng.random::<f64>() < self.config.drop_rate
    }

    /// Serve requests until stopped or `max_requests` is reached
    pub fn run(&mut self) -> anyhow::Result<ResponderStats> {
        while !self.stop.load(Ordering::Acquire) {
            if self.config.max_requests.is_some_and(|max| self.stats.requests >= max) {
                break;
            }
            let Some(frames) = self.requests.recv()? else {
                continue;
            };

            let request = match Request::decode(&frames) {
                Ok(request) => request,
                Err(e) => {
                    self.stats.malformed += 1;
                    tracing::warn!("Ignoring malformed request: {}", e);
                    continue;
                }
            };
            self.stats.requests += 1;

            if self.should_drop() {
                self.stats.dropped += 1;
                tracing::trace!("Dropping request {}", request.id);
                continue;
            }

            if !self.config.delay.is_zero() {
                std::thread::sleep(self.config.delay);
            }

            let reply = self.reply_for(&request);
            reply.with_frames(|frames| self.replies.send(frames))?;
            self.stats.replied += 1;

            if self.stats.requests % 10_000 == 0 {
                tracing::debug!("{} requests processed", self.stats.requests);
            }
        }

        self.replies.close()?;
        Ok(self.stats)
    }
}
