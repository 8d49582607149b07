//! Rig models
//!
//! Each model is a static [`RigCaps`](rig_protocol::RigCaps) table plus a
//! [`RigBackend`](rig_core::RigBackend) that turns session operations into
//! protocol frames.
//!
//! # Models
//!
//! | Number | Model | Protocol |
//! |-------:|-------|----------|
//! | 1 | Dummy | none (in memory) |
//! | 120 | Yaesu FT-817 | 5-byte binary |
//! | 228 | Kenwood TS-480 | ASCII, `;` terminated |
//! | 1602 | Ten-Tec TT-538 Jupiter | binary, CR terminated |
//! | 1611 | Ten-Tec TT-588 Omni VII | binary, CR terminated |
//!
//! # Architecture
//!
//! Backends never touch a transport directly. They build a
//! [`Command`](rig_core::Command) describing the request and the reply shape,
//! and hand it to [`RigIo::transact`](rig_core::RigIo::transact), which owns
//! retries and recovery. Models that the radio cannot address per VFO (mode
//! on the TS-480, everything on the FT-817) rely on the session to switch
//! VFOs around the call.
//!
//! ```
//! use rig_backends::ModelRegistry;
//! use rig_core::{NullTransport, Rig};
//! use rig_protocol::Vfo;
//!
//! let registry = ModelRegistry::with_builtin();
//! let entry = registry.get(1).unwrap();
//! let mut rig = Rig::new(entry.create());
//! rig.open(Box::new(NullTransport)).unwrap();
//! assert_eq!(rig.get_freq(Vfo::A).unwrap(), 145_000_000);
//! ```

pub mod dummy;
pub mod kenwood;
mod ranges;
pub mod registry;
pub mod tentec;
pub mod yaesu;

pub use dummy::Dummy;
pub use kenwood::Ts480;
pub use registry::{ModelEntry, ModelRegistry};
pub use tentec::{DspReset, TenTec};
pub use yaesu::Ft817;
