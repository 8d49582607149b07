//! Rig control core
//!
//! This crate turns a backend's capability table and protocol code into a
//! session with framed I/O, retries and a response cache.
//!
//! # Architecture
//!
//! - [`transport`]: raw byte channels (serial, TCP, null)
//! - [`port`]: framed reads and timed writes over a transport
//! - [`engine`]: flush/write/read/validate with retry and a recovery hook
//! - [`cache`]: per (kind, VFO) memo with a time to live
//! - [`backend`]: the trait each rig model implements
//! - [`rig`]: the session that validates, caches and dispatches
//!
//! Calls flow `Rig` → cache → backend → engine → port → transport.

pub mod backend;
pub mod cache;
pub mod config;
pub mod engine;
pub mod mock;
pub mod port;
pub mod rig;
pub mod shared;
pub mod transport;

pub use backend::{RigBackend, RigIo};
pub use cache::{CacheKind, CacheSelector, CachedValue, EntryState, ManualClock, ResponseCache};
pub use config::RigConfig;
pub use engine::{Command, LengthCheck, RecoveryHook, ReplyCheck, ReplyFormat, TransactionEngine};
pub use port::{PortTiming, RigPort};
pub use rig::{Rig, SessionState};
pub use shared::SharedRig;
pub use transport::{NullTransport, SerialTransport, TcpTransport, Transport};

pub use rig_protocol::RigError;
