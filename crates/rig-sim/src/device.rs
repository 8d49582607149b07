//! Simulated transport
//!
//! [`SimTransport`] wraps an [`Emulator`] and implements
//! [`Transport`](rig_core::Transport): bytes written by the host are parsed
//! into frames, each frame is answered by the emulator, and the answers are
//! queued for reading. Faults are applied between the emulator and the read
//! queue. A [`SimHandle`] keeps access to the emulator, the faults and the
//! counters after the transport has been moved into a session.

use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rig_core::Transport;
use rig_protocol::{EncodeCommand, RigError};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// A radio that answers host frames
pub trait Emulator: Send + 'static {
    /// Parsed host frame
    type Command: Debug;

    fn name(&self) -> &'static str;

    /// Feed bytes written by the host
    fn push_bytes(&mut self, data: &[u8]);

    /// Next complete frame, if one is buffered
    fn next_command(&mut self) -> Option<Self::Command>;

    /// Apply a frame and produce the reply bytes, if the radio answers
    fn respond(&mut self, command: &Self::Command) -> Option<Vec<u8>>;

    /// Whether `command` restarts a hung radio
    fn is_reset(&self, _command: &Self::Command) -> bool {
        false
    }
}

/// Encode a reply, logging instead of failing
pub(crate) fn encode_reply(reply: impl EncodeCommand + Debug) -> Option<Vec<u8>> {
    match reply.encode() {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!("Cannot encode simulated reply {:?}: {}", reply, e);
            None
        }
    }
}

/// Injected misbehaviour
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Faults {
    /// Swallow this many replies
    pub drop_replies: u32,
    /// Corrupt the leading tag byte of this many replies
    pub mistag_replies: u32,
    /// Ignore everything until a reset frame arrives
    pub hung: bool,
}

/// Counters kept by the simulated transport
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimStats {
    pub frames_received: u64,
    pub replies_sent: u64,
    pub replies_dropped: u64,
    pub replies_mistagged: u64,
    pub resets: u64,
}

struct Shared<E> {
    radio: E,
    faults: Faults,
    stats: SimStats,
    rx: VecDeque<u8>,
    closed: bool,
}

impl<E: Emulator> Shared<E> {
    fn handle_frame(&mut self, command: E::Command) {
        self.stats.frames_received += 1;
        trace!("{} <- {:?}", self.radio.name(), command);

        let is_reset = self.radio.is_reset(&command);
        if is_reset {
            self.stats.resets += 1;
            if self.faults.hung {
                debug!("{} restarted", self.radio.name());
                self.faults.hung = false;
            }
        } else if self.faults.hung {
            debug!("{} is hung, ignoring {:?}", self.radio.name(), command);
            return;
        }

        let Some(mut reply) = self.radio.respond(&command) else {
            return;
        };
        if self.faults.drop_replies > 0 {
            self.faults.drop_replies -= 1;
            self.stats.replies_dropped += 1;
            debug!("{} dropped reply {:02X?}", self.radio.name(), reply);
            return;
        }
        if self.faults.mistag_replies > 0 {
            if let Some(tag) = reply.first_mut() {
                // Flip ASCII case, or bit 5 of a binary byte
                *tag ^= 0x20;
            }
            self.faults.mistag_replies -= 1;
            self.stats.replies_mistagged += 1;
        }
        trace!("{} -> {:02X?}", self.radio.name(), reply);
        self.stats.replies_sent += 1;
        self.rx.extend(reply);
    }
}

/// Shared view of a [`SimTransport`]
pub struct SimHandle<E> {
    shared: Arc<Mutex<Shared<E>>>,
}

impl<E> Clone for SimHandle<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E: Emulator> SimHandle<E> {
    fn lock(&self) -> MutexGuard<'_, Shared<E>> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn stats(&self) -> SimStats {
        self.lock().stats
    }

    /// Complete host frames seen so far, including ignored ones
    pub fn frames_received(&self) -> u64 {
        self.lock().stats.frames_received
    }

    pub fn faults(&self) -> Faults {
        self.lock().faults.clone()
    }

    pub fn set_faults(&self, faults: Faults) {
        self.lock().faults = faults;
    }

    /// Swallow the next `n` replies
    pub fn drop_next(&self, n: u32) {
        self.lock().faults.drop_replies += n;
    }

    /// Corrupt the tag of the next `n` replies
    pub fn mistag_next(&self, n: u32) {
        self.lock().faults.mistag_replies += n;
    }

    /// Stop answering until the radio is reset
    pub fn hang(&self) {
        self.lock().faults.hung = true;
    }

    pub fn is_hung(&self) -> bool {
        self.lock().faults.hung
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Run `f` against the emulated radio
    pub fn with_radio<R>(&self, f: impl FnOnce(&mut E) -> R) -> R {
        f(&mut self.lock().radio)
    }
}

/// Transport backed by an emulated radio
pub struct SimTransport<E> {
    handle: SimHandle<E>,
}

impl<E: Emulator> SimTransport<E> {
    pub fn new(radio: E) -> Self {
        Self::with_faults(radio, Faults::default())
    }

    pub fn with_faults(radio: E, faults: Faults) -> Self {
        Self {
            handle: SimHandle {
                shared: Arc::new(Mutex::new(Shared {
                    radio,
                    faults,
                    stats: SimStats::default(),
                    rx: VecDeque::new(),
                    closed: false,
                })),
            },
        }
    }

    pub fn handle(&self) -> SimHandle<E> {
        self.handle.clone()
    }
}

impl<E: Emulator> Transport for SimTransport<E> {
    fn write(&mut self, data: &[u8]) -> Result<(), RigError> {
        let mut shared = self.handle.lock();
        if shared.closed {
            return Err(RigError::NotOpen);
        }
        shared.radio.push_bytes(data);
        while let Some(command) = shared.radio.next_command() {
            shared.handle_frame(command);
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, RigError> {
        let mut shared = self.handle.lock();
        if shared.closed {
            return Err(RigError::NotOpen);
        }
        if shared.rx.is_empty() {
            // Replies are produced synchronously by write; nothing more will come
            return Err(RigError::Timeout);
        }
        let n = buf.len().min(shared.rx.len());
        for (slot, byte) in buf.iter_mut().zip(shared.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn flush_input(&mut self) -> Result<(), RigError> {
        self.handle.lock().rx.clear();
        Ok(())
    }

    fn close(&mut self) -> Result<(), RigError> {
        self.handle.lock().closed = true;
        Ok(())
    }

    fn description(&self) -> String {
        format!("sim:{}", self.handle.lock().radio.name())
    }
}
