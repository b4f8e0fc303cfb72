//! In-process push/pull channel
//!
//! Mirrors the ZeroMQ channel semantics on top of a std mpsc queue: sends are
//! queued, `recv` blocks for at most the idle timeout, and a closed sender
//! simply looks idle to the receiving side.

use crate::{Error, FrameSink, FrameSource, Frames, Result};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// Create a connected sink/source pair with the given idle receive timeout
pub fn channel(recv_timeout: Duration) -> (MemorySink, MemorySource) {
    let (tx, rx) = mpsc::channel();
    (MemorySink { tx: Some(tx) }, MemorySource { rx, recv_timeout })
}

/// Sending half of an in-process channel
pub struct MemorySink {
    tx: Option<Sender<Frames>>,
}

impl FrameSink for MemorySink {
    fn send(&mut self, frames: &[&[u8]]) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(Error::Closed)?;
        let owned: Frames = frames.iter().map(|frame| frame.to_vec()).collect();
        tx.send(owned).map_err(|_| Error::Closed)
    }

    fn close(&mut self) -> Result<()> {
        self.tx = None;
        Ok(())
    }
}

/// Receiving half of an in-process channel
pub struct MemorySource {
    rx: Receiver<Frames>,
    recv_timeout: Duration,
}

impl FrameSource for MemorySource {
    fn recv(&mut self) -> Result<Option<Frames>> {
        match self.rx.recv_timeout(self.recv_timeout) {
            Ok(frames) => Ok(Some(frames)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                // A PULL socket keeps listening after its peers go away
                std::thread::sleep(self.recv_timeout);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_arrive_in_order() {
        let (mut sink, mut source) = channel(Duration::from_millis(10));
        sink.send(&[b"a", b"b"]).unwrap();
        sink.send(&[b"c"]).unwrap();

        assert_eq!(source.recv().unwrap(), Some(vec![b"a".to_vec(), b"b".to_vec()]));
        assert_eq!(source.recv().unwrap(), Some(vec![b"c".to_vec()]));
        assert_eq!(source.recv().unwrap(), None);
    }

    #[test]
    fn test_closed_sink_rejects_sends_and_source_stays_idle() {
        let (mut sink, mut source) = channel(Duration::from_millis(5));
        sink.close().unwrap();

        assert!(matches!(sink.send(&[b"x"]), Err(Error::Closed)));
        assert_eq!(source.recv().unwrap(), None);
    }
}
