//! Request and reply wire formats
//!
//! Request: `[id: u32 big-endian][domain][ip]`
//! Reply:   `[id: u32 big-endian][score][category]`
//!
//! Both are three-frame multipart messages. Score and category are opaque to
//! the harness; they are consumed to keep framing intact and otherwise ignored.

use crate::{Error, Result};

/// Number of frames in every request and reply message
pub const FRAME_COUNT: usize = 3;

/// Size of the correlation id frame
pub const ID_LEN: usize = 4;

/// A synthetic request sent to the decision endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Correlation id, 1-based and unique for the run
    pub id: u32,
    pub domain: String,
    pub ip: String,
}

impl Request {
    pub fn new(id: u32, domain: impl Into<String>, ip: impl Into<String>) -> Self {
        Self { id, domain: domain.into(), ip: ip.into() }
    }

    /// Send this request as one multipart message through `send`
    pub fn with_frames<R>(&self, send: impl FnOnce(&[&[u8]]) -> R) -> R {
        let id = self.id.to_be_bytes();
        send(&[&id, self.domain.as_bytes(), self.ip.as_bytes()])
    }

    /// Decode a request (used by the responding side)
    pub fn decode(frames: &[Vec<u8>]) -> Result<Self> {
        check_frame_count(frames)?;
        let id = decode_id(&frames[0])?;
        let domain = utf8_frame(&frames[1], "domain")?;
        let ip = utf8_frame(&frames[2], "ip")?;
        Ok(Self { id, domain, ip })
    }
}

/// A reply from the decision endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub id: u32,
    pub score: Vec<u8>,
    pub category: Vec<u8>,
}

impl Reply {
    /// Decode a reply; the payload frames are kept as raw bytes
    pub fn decode(frames: &[Vec<u8>]) -> Result<Self> {
        check_frame_count(frames)?;
        let id = decode_id(&frames[0])?;
        Ok(Self { id, score: frames[1].clone(), category: frames[2].clone() })
    }

    /// Send this reply as one multipart message through `send`
    pub fn with_frames<R>(&self, send: impl FnOnce(&[&[u8]]) -> R) -> R {
        let id = self.id.to_be_bytes();
        send(&[&id, &self.score, &self.category])
    }
}

/// Decode a 4-byte big-endian correlation id frame
pub fn decode_id(frame: &[u8]) -> Result<u32> {
    let bytes: [u8; ID_LEN] = frame.try_into().map_err(|_| {
        Error::Protocol(format!("id frame must be {ID_LEN} bytes, got {}", frame.len()))
    })?;
    Ok(u32::from_be_bytes(bytes))
}

fn check_frame_count(frames: &[Vec<u8>]) -> Result<()> {
    if frames.len() != FRAME_COUNT {
        return Err(Error::Protocol(format!(
            "expected {FRAME_COUNT} frames, got {}",
            frames.len()
        )));
    }
    Ok(())
}

fn utf8_frame(frame: &[u8], field: &str) -> Result<String> {
    String::from_utf8(frame.to_vec())
        .map_err(|_| Error::Protocol(format!("{field} frame is not valid UTF-8")))
}
