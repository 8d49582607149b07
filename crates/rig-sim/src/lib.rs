//! Radio emulation for rig control testing
//!
//! This crate lets a [`Rig`](rig_core::Rig) session run against a radio
//! without hardware. It includes:
//!
//! - **VirtualTenTec**: TT-588 / TT-538 binary protocol, including the DSP
//!   reset banner
//! - **VirtualKenwood**: TS-480 ASCII protocol with `?;` rejections
//! - **VirtualYaesu**: FT-817 5-byte commands and status bytes
//!
//! Each emulator is wrapped in a [`SimTransport`], which can drop replies,
//! corrupt their tags, or play dead until the radio is reset.
//!
//! # Example
//!
//! ```rust
//! use rig_core::Transport;
//! use rig_sim::{SimTransport, VirtualKenwood, VirtualRigConfig};
//! use std::time::Duration;
//!
//! let mut radio = SimTransport::new(VirtualKenwood::new(&VirtualRigConfig::default()));
//! let handle = radio.handle();
//!
//! radio.write(b"FA;").unwrap();
//! let mut buf = [0u8; 32];
//! let n = radio.read(&mut buf, Duration::from_millis(10)).unwrap();
//! assert_eq!(&buf[..n], b"FA00014074000;");
//! assert_eq!(handle.frames_received(), 1);
//! ```

pub mod config;
pub mod device;
pub mod kenwood;
pub mod tentec;
pub mod yaesu;

pub use config::VirtualRigConfig;
pub use device::{Emulator, Faults, SimHandle, SimStats, SimTransport};
pub use kenwood::VirtualKenwood;
pub use tentec::VirtualTenTec;
pub use yaesu::VirtualYaesu;
