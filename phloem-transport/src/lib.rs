//! Phloem Transport Layer
//!
//! This crate provides the one-directional message channels used by the phloem
//! round-trip latency harness. Every message is a multipart frame list; the
//! harness sends requests on a push channel and collects replies on a pull
//! channel, both bound by the measuring process.
//!
//! ## Available Channels
//!
//! - **ZeroMQ**: `ZmqPush` / `ZmqPull` sockets over TCP (the production path)
//! - **Memory**: an in-process channel pair with the same semantics, used for
//!   loopback runs and tests
//!
//! ## Channel APIs
//!
//! Senders implement [`FrameSink`], receivers implement [`FrameSource`]. Both
//! are blocking so the caller keeps full control of its own scheduling.
//!
//! ```rust,no_run
//! use phloem_transport::{zmq, ChannelOptions, FrameSink, FrameSource, ZmqPull, ZmqPush};
//!
//! let ctx = zmq::Context::new();
//! let options = ChannelOptions::default();
//!
//! let mut push = ZmqPush::bind(&ctx, "tcp://127.0.0.1:5555", &options).unwrap();
//! let mut pull = ZmqPull::bind(&ctx, "tcp://127.0.0.1:5556", &options).unwrap();
//!
//! push.send(&[&7u32.to_be_bytes(), b"example.com", b"10.0.0.1"]).unwrap();
//! if let Some(frames) = pull.recv().unwrap() {
//!     println!("reply with {} frames", frames.len());
//! }
//! push.close().unwrap();
//! ```

use std::fmt;
use std::time::Duration;

pub mod memory;
pub mod zeromq;

pub use memory::{channel as memory_channel, MemorySink, MemorySource};
pub use zeromq::{ZmqPull, ZmqPush};

// Callers create the shared context without depending on zmq directly
pub use zmq;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, Error>;

/// A multipart message as received from a channel
pub type Frames = Vec<Vec<u8>>;

/// Transport layer error types
#[derive(Debug)]
pub enum Error {
    /// I/O errors from the underlying socket
    Io(std::io::Error),

    /// Binding the local endpoint failed
    Bind { endpoint: String, reason: String },

    /// ZeroMQ library errors
    Zmq(zmq::Error),

    /// A send could not be queued before the send timeout expired
    Timeout(String),

    /// The channel has been closed
    Closed,

    /// Other errors
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Bind { endpoint, reason } => write!(f, "Failed to bind {endpoint}: {reason}"),
            Error::Zmq(e) => write!(f, "ZeroMQ error: {e}"),
            Error::Timeout(msg) => write!(f, "Timed out: {msg}"),
            Error::Closed => write!(f, "Channel closed"),
            Error::Other(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<zmq::Error> for Error {
    fn from(err: zmq::Error) -> Self {
        Error::Zmq(err)
    }
}

/// Socket options shared by push and pull channels
#[derive(Debug, Clone)]
pub struct ChannelOptions {
    /// How long buffered outbound frames may still be flushed after close
    pub linger: Duration,
    /// Upper bound for queuing a single outbound message
    pub send_timeout: Duration,
    /// Idle receive timeout; `recv` returns `None` once it elapses
    pub recv_timeout: Duration,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            linger: Duration::from_secs(1),
            send_timeout: Duration::from_secs(5),
            recv_timeout: Duration::from_millis(100),
        }
    }
}

/// Outbound side of a push/pull channel
pub trait FrameSink: Send {
    /// Send one multipart message
    ///
    /// Returns once the message has been queued by the channel. Sends are
    /// never retried by the transport.
    fn send(&mut self, frames: &[&[u8]]) -> Result<()>;

    /// Close the channel
    ///
    /// Frames still buffered are flushed for at most the configured linger
    /// period. Sending after close returns [`Error::Closed`].
    fn close(&mut self) -> Result<()>;
}

/// Inbound side of a push/pull channel
pub trait FrameSource: Send {
    /// Receive one multipart message
    ///
    /// Blocks for at most the idle receive timeout. `Ok(None)` means nothing
    /// arrived in that window.
    fn recv(&mut self) -> Result<Option<Frames>>;
}

impl<T: FrameSink + ?Sized> FrameSink for Box<T> {
    fn send(&mut self, frames: &[&[u8]]) -> Result<()> {
        (**self).send(frames)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn recv(&mut self) -> Result<Option<Frames>> {
        (**self).recv()
    }
}

/// Build a TCP endpoint string from an interface address and port
///
/// `*` and IPv6 literals are accepted as the address; port 0 lets the OS pick
/// a free port (use `bound_endpoint` to discover it).
pub fn tcp_endpoint(address: &str, port: u16) -> String {
    let port = if port == 0 { "*".to_string() } else { port.to_string() };
    if address.contains(':') && !address.starts_with('[') {
        format!("tcp://[{address}]:{port}")
    } else {
        format!("tcp://{address}:{port}")
    }
}

pub(crate) fn millis_i32(duration: Duration) -> i32 {
    duration.as_millis().min(i32::MAX as u128) as i32
}
