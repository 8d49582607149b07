//! Scripted transport for tests
//!
//! [`MockTransport`] replays request/response pairs in order. Written bytes
//! are accumulated until they cover the next expected request, so frames sent
//! one byte at a time (write delay) still match. A [`MockHandle`] keeps access
//! to the write log after the transport has been moved into a port.
//!
//! ```
//! use rig_core::mock::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! mock.expect(b"FA;", b"FA00014074000;");
//! let handle = mock.handle();
//! assert_eq!(handle.remaining(), 1);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rig_protocol::RigError;

use crate::transport::Transport;

#[derive(Debug, Clone)]
struct Expectation {
    request: Vec<u8>,
    response: Option<Vec<u8>>,
}

#[derive(Debug, Default)]
struct MockState {
    expectations: VecDeque<Expectation>,
    /// Accept every write and never reply
    silent: bool,
    tx_buf: Vec<u8>,
    rx: VecDeque<u8>,
    writes: Vec<Vec<u8>>,
    closed: bool,
}

/// Shared view of a [`MockTransport`]
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every `write` call, in order
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.lock().writes.clone()
    }

    /// Number of `write` calls so far
    pub fn write_count(&self) -> usize {
        self.lock().writes.len()
    }

    /// Expectations not yet consumed
    pub fn remaining(&self) -> usize {
        self.lock().expectations.len()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Queue another request/response pair
    pub fn expect(&self, request: &[u8], response: &[u8]) {
        self.lock().expectations.push_back(Expectation {
            request: request.to_vec(),
            response: Some(response.to_vec()),
        });
    }
}

/// Transport that replays scripted replies
#[derive(Debug)]
pub struct MockTransport {
    handle: MockHandle,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            handle: MockHandle {
                state: Arc::new(Mutex::new(MockState::default())),
            },
        }
    }

    /// A device that accepts every write and never answers
    pub fn silent() -> Self {
        let mock = Self::new();
        mock.handle.lock().silent = true;
        mock
    }

    pub fn handle(&self) -> MockHandle {
        self.handle.clone()
    }

    /// When `request` is written, make `response` readable
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.handle.expect(request, response);
    }

    /// `request` is expected but the device stays quiet
    pub fn expect_silence(&mut self, request: &[u8]) {
        self.handle.lock().expectations.push_back(Expectation {
            request: request.to_vec(),
            response: None,
        });
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn write(&mut self, data: &[u8]) -> Result<(), RigError> {
        let mut state = self.handle.lock();
        if state.closed {
            return Err(RigError::NotOpen);
        }
        state.writes.push(data.to_vec());
        if state.silent {
            return Ok(());
        }

        state.tx_buf.extend_from_slice(data);
        let Some(next) = state.expectations.front() else {
            return Err(RigError::Io(format!(
                "unexpected write {:02X?}: no more expectations",
                state.tx_buf
            )));
        };
        let want = next.request.len();
        let have = state.tx_buf.len().min(want);
        if state.tx_buf[..have] != next.request[..have] {
            let err = RigError::Io(format!(
                "unexpected write: expected {:02X?}, got {:02X?}",
                next.request, state.tx_buf
            ));
            state.tx_buf.clear();
            return Err(err);
        }
        if state.tx_buf.len() >= want {
            state.tx_buf.drain(..want);
            if let Some(Expectation {
                response: Some(response),
                ..
            }) = state.expectations.pop_front()
            {
                state.rx.extend(response);
            }
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, RigError> {
        let mut state = self.handle.lock();
        if state.closed {
            return Err(RigError::NotOpen);
        }
        let n = state.rx.len().min(buf.len());
        if n == 0 {
            return Err(RigError::Timeout);
        }
        for (slot, byte) in buf.iter_mut().zip(state.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn flush_input(&mut self) -> Result<(), RigError> {
        self.handle.lock().rx.clear();
        Ok(())
    }

    fn close(&mut self) -> Result<(), RigError> {
        let mut state = self.handle.lock();
        state.closed = true;
        state.rx.clear();
        Ok(())
    }

    fn description(&self) -> String {
        "mock".into()
    }
}
