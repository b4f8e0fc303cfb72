//! Phloem Core Library
//!
//! This crate provides the measurement engine of the phloem round-trip latency
//! harness: the rate-paced request sender, the reply receiver, the shared
//! correlation store that matches replies to requests, and the percentile
//! reporter that runs once the drain window closes.

pub mod correlation;
pub mod error;
pub mod harness;
pub mod receiver;
pub mod request;
pub mod seed;
pub mod sender;
pub mod stats;
pub mod timing;
pub mod workload;

// Re-export channel types from phloem-transport
pub use phloem_transport::{ChannelOptions, FrameSink, FrameSource, Frames};

pub use correlation::{CorrelationRecord, CorrelationStore, Counters, ReplyOutcome};
pub use error::{Error, Result};
pub use harness::{run_benchmark, BenchmarkConfig, RunOutcome};
pub use receiver::{Receiver, ReceiverHandle, ReceiverSummary};
pub use request::{Reply, Request};
pub use sender::{SendSummary, Sender, SenderConfig};
pub use stats::{LatencyReport, Percentiles};
pub use workload::{PayloadPool, RequestGenerator};
