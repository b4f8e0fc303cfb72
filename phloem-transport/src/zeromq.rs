//! ZeroMQ push/pull channels
//!
//! The harness binds both of its sockets; the decision endpoint connects to
//! them. Sockets are blocking with explicit timeouts so the caller's loops can
//! terminate deterministically.

use crate::{millis_i32, ChannelOptions, Error, FrameSink, FrameSource, Frames, Result};

fn configure(socket: &zmq::Socket, options: &ChannelOptions) -> Result<()> {
    socket.set_linger(millis_i32(options.linger))?;
    socket.set_sndtimeo(millis_i32(options.send_timeout))?;
    socket.set_rcvtimeo(millis_i32(options.recv_timeout))?;
    socket.set_ipv6(true)?;
    Ok(())
}

fn bind(socket: &zmq::Socket, endpoint: &str) -> Result<()> {
    socket.bind(endpoint).map_err(|e| Error::Bind {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

fn last_endpoint(socket: &zmq::Socket) -> Result<String> {
    socket
        .get_last_endpoint()?
        .map_err(|raw| Error::Other(format!("Non UTF-8 endpoint: {raw:?}")))
}

/// Outbound PUSH socket
pub struct ZmqPush {
    socket: Option<zmq::Socket>,
    endpoint: String,
}

impl ZmqPush {
    /// Create a PUSH socket bound to `endpoint`
    ///
    /// Bind failures are reported as [`Error::Bind`] and are not retried.
    pub fn bind(ctx: &zmq::Context, endpoint: &str, options: &ChannelOptions) -> Result<Self> {
        let socket = ctx.socket(zmq::PUSH)?;
        configure(&socket, options)?;
        bind(&socket, endpoint)?;
        let endpoint = last_endpoint(&socket)?;
        tracing::debug!("PUSH socket bound to {}", endpoint);
        Ok(Self { socket: Some(socket), endpoint })
    }

    /// Create a PUSH socket connected to a remote PULL endpoint
    pub fn connect(ctx: &zmq::Context, endpoint: &str, options: &ChannelOptions) -> Result<Self> {
        let socket = ctx.socket(zmq::PUSH)?;
        configure(&socket, options)?;
        socket.connect(endpoint)?;
        tracing::debug!("PUSH socket connected to {}", endpoint);
        Ok(Self { socket: Some(socket), endpoint: endpoint.to_string() })
    }

    /// The endpoint actually bound or connected (resolves wildcard ports)
    pub fn bound_endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl FrameSink for ZmqPush {
    fn send(&mut self, frames: &[&[u8]]) -> Result<()> {
        let socket = self.socket.as_ref().ok_or(Error::Closed)?;
        match socket.send_multipart(frames.iter().copied(), 0) {
            Ok(()) => Ok(()),
            Err(zmq::Error::EAGAIN) => Err(Error::Timeout(format!(
                "no peer accepted the message on {}",
                self.endpoint
            ))),
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self) -> Result<()> {
        // Dropping the socket hands pending frames to the context, which keeps
        // flushing them for at most the linger period.
        if self.socket.take().is_some() {
            tracing::debug!("PUSH socket on {} closed", self.endpoint);
        }
        Ok(())
    }
}

/// Inbound PULL socket
pub struct ZmqPull {
    socket: zmq::Socket,
    endpoint: String,
}

impl ZmqPull {
    /// Create a PULL socket bound to `endpoint`
    pub fn bind(ctx: &zmq::Context, endpoint: &str, options: &ChannelOptions) -> Result<Self> {
        let socket = ctx.socket(zmq::PULL)?;
        configure(&socket, options)?;
        bind(&socket, endpoint)?;
        let endpoint = last_endpoint(&socket)?;
        tracing::debug!("PULL socket bound to {}", endpoint);
        Ok(Self { socket, endpoint })
    }

    /// Create a PULL socket connected to a remote PUSH endpoint
    pub fn connect(ctx: &zmq::Context, endpoint: &str, options: &ChannelOptions) -> Result<Self> {
        let socket = ctx.socket(zmq::PULL)?;
        configure(&socket, options)?;
        socket.connect(endpoint)?;
        tracing::debug!("PULL socket connected to {}", endpoint);
        Ok(Self { socket, endpoint: endpoint.to_string() })
    }

    pub fn bound_endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl FrameSource for ZmqPull {
    fn recv(&mut self) -> Result<Option<Frames>> {
        match self.socket.recv_multipart(0) {
            Ok(frames) => Ok(Some(frames)),
            Err(zmq::Error::EAGAIN) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
