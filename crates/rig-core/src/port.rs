//! Framed I/O over a [`Transport`]
//!
//! [`RigPort`] applies the model's timing (inter-byte write delay, post-write
//! delay, read timeout) and turns the transport's byte stream into blocks and
//! terminated strings. Bytes read past a terminator are kept for the next read.

use std::fmt;
use std::thread;
use std::time::Duration;

use rig_protocol::caps::PortCaps;
use rig_protocol::RigError;
use tracing::trace;

use crate::transport::Transport;

/// Timing parameters for a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PortTiming {
    /// Bound on every individual read
    pub timeout: Duration,
    /// Pause after every written byte
    pub write_delay: Duration,
    /// Pause after the whole frame has been written
    pub post_write_delay: Duration,
}

impl PortTiming {
    /// Timing declared by a model's port record
    pub fn from_caps(port: &PortCaps) -> Self {
        Self {
            timeout: Duration::from_millis(port.timeout_ms),
            write_delay: Duration::from_millis(port.write_delay_ms),
            post_write_delay: Duration::from_millis(port.post_write_delay_ms),
        }
    }
}

/// An open port: a transport plus timing
pub struct RigPort {
    transport: Box<dyn Transport>,
    timing: PortTiming,
    pending: Vec<u8>,
}

impl fmt::Debug for RigPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RigPort")
            .field("transport", &self.description())
            .field("timing", &self.timing)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl RigPort {
    pub fn new(transport: Box<dyn Transport>, timing: PortTiming) -> Self {
        Self {
            transport,
            timing,
            pending: Vec::new(),
        }
    }

    pub fn timing(&self) -> PortTiming {
        self.timing
    }

    pub fn set_timing(&mut self, timing: PortTiming) {
        self.timing = timing;
    }

    pub fn description(&self) -> String {
        self.transport.description()
    }

    /// Discard buffered and unread input
    pub fn flush(&mut self) -> Result<(), RigError> {
        if !self.pending.is_empty() {
            trace!("Dropping {} buffered bytes", self.pending.len());
            self.pending.clear();
        }
        self.transport.flush_input()
    }

    /// Write a frame, honouring the write delays
    pub fn write_block(&mut self, data: &[u8]) -> Result<(), RigError> {
        trace!("TX {:02X?}", data);
        if self.timing.write_delay.is_zero() {
            self.transport.write(data)?;
        } else {
            for byte in data {
                self.transport.write(std::slice::from_ref(byte))?;
                thread::sleep(self.timing.write_delay);
            }
        }
        if !self.timing.post_write_delay.is_zero() {
            thread::sleep(self.timing.post_write_delay);
        }
        Ok(())
    }

    /// Read exactly `len` bytes
    ///
    /// A timeout before the block is complete is reported as
    /// [`RigError::Timeout`] and the partial data is discarded.
    pub fn read_block(&mut self, len: usize) -> Result<Vec<u8>, RigError> {
        while self.pending.len() < len {
            if let Err(e) = self.fill() {
                if e == RigError::Timeout && !self.pending.is_empty() {
                    trace!(
                        "Short block: got {} of {} bytes: {:02X?}",
                        self.pending.len(),
                        len,
                        self.pending
                    );
                    self.pending.clear();
                }
                return Err(e);
            }
        }
        let block: Vec<u8> = self.pending.drain(..len).collect();
        trace!("RX {:02X?}", block);
        Ok(block)
    }

    /// Read up to and including the first byte found in `stopset`
    ///
    /// At most `max_len` bytes are returned. If the device goes quiet after
    /// sending something, the partial string is returned; only a read that
    /// produced nothing at all is a timeout.
    pub fn read_string(&mut self, stopset: &[u8], max_len: usize) -> Result<Vec<u8>, RigError> {
        loop {
            let limit = self.pending.len().min(max_len);
            if let Some(pos) = self.pending[..limit]
                .iter()
                .position(|b| stopset.contains(b))
            {
                return Ok(self.take(pos + 1));
            }
            if self.pending.len() >= max_len {
                return Ok(self.take(max_len));
            }
            match self.fill() {
                Ok(()) => {}
                Err(RigError::Timeout) if !self.pending.is_empty() => {
                    let n = self.pending.len();
                    return Ok(self.take(n));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Close the transport
    pub fn close(&mut self) -> Result<(), RigError> {
        self.pending.clear();
        self.transport.close()
    }

    fn take(&mut self, n: usize) -> Vec<u8> {
        let out: Vec<u8> = self.pending.drain(..n).collect();
        trace!("RX {:02X?}", out);
        out
    }

    fn fill(&mut self) -> Result<(), RigError> {
        let mut buf = [0u8; 256];
        let n = self.transport.read(&mut buf, self.timing.timeout)?;
        self.pending.extend_from_slice(&buf[..n]);
        Ok(())
    }
}
