//! Rig Protocol Library
//!
//! This crate provides the wire-level and data-level pieces of rig control
//! for amateur radio transceivers:
//!
//! - **Normalized types**: frequency, mode, VFO, PTT, split and level values
//! - **Frame building**: length-checked field encoders (big-endian, ASCII
//!   decimal, BCD) and the matching decoders
//! - **Capability tables**: immutable per-model descriptions used to
//!   validate requests without touching the device
//! - **Vendor codecs**:
//!   - **Ten-Tec**: binary register commands terminated by CR (Omni VII, Jupiter)
//!   - **Kenwood**: ASCII semicolon-terminated commands (TS-480)
//!   - **Yaesu CAT**: 5-byte binary commands with BCD frequency encoding (FT-817)
//!
//! # Architecture
//!
//! Each vendor module provides:
//! - A command enum that encodes to protocol bytes ([`EncodeCommand`])
//! - A streaming frame parser for host → radio traffic ([`ProtocolCodec`]),
//!   used by device emulators
//! - Reply decoders that validate the tag and length of radio → host frames
//!
//! # Example
//!
//! ```rust
//! use rig_protocol::kenwood::{KenwoodCodec, KenwoodCommand};
//! use rig_protocol::ProtocolCodec;
//!
//! let mut codec = KenwoodCodec::new();
//! codec.push_bytes(b"FA00014250000;");
//!
//! assert_eq!(
//!     codec.next_command(),
//!     Some(KenwoodCommand::FrequencyA(Some(14_250_000)))
//! );
//! ```

pub mod caps;
pub mod error;
pub mod frame;
pub mod kenwood;
pub mod tentec;
pub mod types;
pub mod yaesu;

pub use caps::{FilterTable, FuncSet, Op, ParmSet, RigCaps};
pub use error::{EncodeError, ErrorKind, ParseError, RigError};
pub use frame::FrameBuilder;
pub use types::{Agc, Freq, Func, Level, Mode, Offset, Parm, Ptt, Split, Value, Vfo, Width};

/// Trait for protocol codecs that can parse incoming data streams
pub trait ProtocolCodec {
    /// The command type produced by this codec
    type Command;

    /// Push raw bytes into the codec's buffer
    fn push_bytes(&mut self, data: &[u8]);

    /// Try to extract the next complete command from the buffer
    fn next_command(&mut self) -> Option<Self::Command>;

    /// Try to extract the next complete command along with its raw bytes
    fn next_command_with_bytes(&mut self) -> Option<(Self::Command, Vec<u8>)>;

    /// Clear the internal buffer
    fn clear(&mut self);
}

/// Trait for commands and replies that can be encoded to bytes
pub trait EncodeCommand {
    /// Encode this command to its wire format
    fn encode(&self) -> Result<Vec<u8>, EncodeError>;
}
