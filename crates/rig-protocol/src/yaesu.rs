//! Yaesu CAT Protocol Implementation
//!
//! The Yaesu CAT protocol uses 5-byte binary commands.
//!
//! # Command Format (FT-817/857/897 style)
//! ```text
//! [P1] [P2] [P3] [P4] [CMD]
//! ```
//!
//! - Bytes 0-3: Parameters (meaning depends on command)
//! - Byte 4: Command opcode
//!
//! # Frequency Encoding
//! Frequencies are BCD encoded in bytes 0-3 (big-endian) in 10 Hz units.
//! Example: 14.250.00 MHz = 0x01 0x42 0x50 0x00
//!
//! Most commands are write-only. `ReadFreqMode` answers with 5 bytes
//! (frequency + mode), the status reads answer with a single byte.

use crate::error::{EncodeError, ParseError};
use crate::frame::{bcd_to_u64, FrameBuilder};
use crate::types::Mode;
use crate::{EncodeCommand, ProtocolCodec};

/// Standard Yaesu command length
pub const COMMAND_LEN: usize = 5;

/// Length of the frequency/mode reply
pub const FREQ_MODE_REPLY_LEN: usize = 5;

/// Highest frequency the 8-digit, 10 Hz BCD field can carry
pub const MAX_FREQ_HZ: u64 = 999_999_990;

/// Yaesu command opcodes (FT-817/857/897 compatible)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YaesuOpcode {
    LockOn = 0x00,
    LockOff = 0x80,
    SetFrequency = 0x01,
    SetMode = 0x07,
    ToggleVfo = 0x81,
    SplitOn = 0x02,
    SplitOff = 0x82,
    PttOn = 0x08,
    PttOff = 0x88,
    ReadRxStatus = 0xE7,
    ReadTxStatus = 0xF7,
    ReadFreqMode = 0x03,
}

impl TryFrom<u8> for YaesuOpcode {
    type Error = ParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::LockOn),
            0x80 => Ok(Self::LockOff),
            0x01 => Ok(Self::SetFrequency),
            0x07 => Ok(Self::SetMode),
            0x81 => Ok(Self::ToggleVfo),
            0x02 => Ok(Self::SplitOn),
            0x82 => Ok(Self::SplitOff),
            0x08 => Ok(Self::PttOn),
            0x88 => Ok(Self::PttOff),
            0xE7 => Ok(Self::ReadRxStatus),
            0xF7 => Ok(Self::ReadTxStatus),
            0x03 => Ok(Self::ReadFreqMode),
            _ => Err(ParseError::InvalidFrame(format!(
                "Yaesu opcode 0x{:02X}",
                value
            ))),
        }
    }
}

/// Yaesu protocol command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YaesuCommand {
    /// Set frequency (10 Hz resolution)
    SetFrequency { hz: u64 },
    /// Read frequency and mode
    ReadFreqMode,
    /// Set operating mode (raw mode byte)
    SetMode { mode: u8 },
    PttOn,
    PttOff,
    /// Toggle VFO A/B
    ToggleVfo,
    SplitOn,
    SplitOff,
    /// Read RX status byte
    ReadRxStatus,
    /// Read TX status byte
    ReadTxStatus,
    LockOn,
    LockOff,
    /// Unknown command
    Unknown { bytes: [u8; 5] },
}

/// Yaesu RX status byte flags
pub mod rx_status {
    /// Squelch closed (no signal)
    pub const SQUELCH_CLOSED: u8 = 0x80;
    /// CTCSS/DCS mismatch
    pub const TONE_MISMATCH: u8 = 0x40;
    /// Discriminator off center
    pub const DISC_OFF_CENTER: u8 = 0x20;
    /// S-meter reading (bits 0-3)
    pub const S_METER_MASK: u8 = 0x0F;
}

/// Yaesu TX status byte flags
pub mod tx_status {
    /// PTT released; the bit is clear while transmitting
    pub const PTT_OFF: u8 = 0x80;
    /// High SWR
    pub const HIGH_SWR: u8 = 0x40;
    /// Split active
    pub const SPLIT: u8 = 0x20;
    /// Power output meter (bits 0-3)
    pub const METER_MASK: u8 = 0x0F;
}

impl YaesuCommand {
    /// Length of the reply this command produces, 0 for write-only commands
    pub fn reply_len(&self) -> usize {
        match self {
            Self::ReadFreqMode => FREQ_MODE_REPLY_LEN,
            Self::ReadRxStatus | Self::ReadTxStatus => 1,
            _ => 0,
        }
    }

    /// Parse a 5-byte command
    fn parse(bytes: &[u8; 5]) -> YaesuCommand {
        match YaesuOpcode::try_from(bytes[4]) {
            Ok(YaesuOpcode::SetFrequency) => match bcd_to_u64(&bytes[..4]) {
                Ok(v) => YaesuCommand::SetFrequency { hz: v * 10 },
                Err(_) => YaesuCommand::Unknown { bytes: *bytes },
            },
            Ok(YaesuOpcode::ReadFreqMode) => YaesuCommand::ReadFreqMode,
            Ok(YaesuOpcode::SetMode) => YaesuCommand::SetMode { mode: bytes[0] },
            Ok(YaesuOpcode::PttOn) => YaesuCommand::PttOn,
            Ok(YaesuOpcode::PttOff) => YaesuCommand::PttOff,
            Ok(YaesuOpcode::ToggleVfo) => YaesuCommand::ToggleVfo,
            Ok(YaesuOpcode::SplitOn) => YaesuCommand::SplitOn,
            Ok(YaesuOpcode::SplitOff) => YaesuCommand::SplitOff,
            Ok(YaesuOpcode::ReadRxStatus) => YaesuCommand::ReadRxStatus,
            Ok(YaesuOpcode::ReadTxStatus) => YaesuCommand::ReadTxStatus,
            Ok(YaesuOpcode::LockOn) => YaesuCommand::LockOn,
            Ok(YaesuOpcode::LockOff) => YaesuCommand::LockOff,
            Err(_) => YaesuCommand::Unknown { bytes: *bytes },
        }
    }
}

impl EncodeCommand for YaesuCommand {
    fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let opcode = |op: YaesuOpcode| {
            FrameBuilder::new()
                .bytes(&[0x00, 0x00, 0x00, 0x00])
                .byte(op as u8)
                .build()
        };
        match self {
            Self::SetFrequency { hz } => FrameBuilder::new()
                .bcd_be(hz / 10, 8)
                .byte(YaesuOpcode::SetFrequency as u8)
                .build(),
            Self::ReadFreqMode => opcode(YaesuOpcode::ReadFreqMode),
            Self::SetMode { mode } => FrameBuilder::new()
                .byte(*mode)
                .bytes(&[0x00, 0x00, 0x00])
                .byte(YaesuOpcode::SetMode as u8)
                .build(),
            Self::PttOn => opcode(YaesuOpcode::PttOn),
            Self::PttOff => opcode(YaesuOpcode::PttOff),
            Self::ToggleVfo => opcode(YaesuOpcode::ToggleVfo),
            Self::SplitOn => opcode(YaesuOpcode::SplitOn),
            Self::SplitOff => opcode(YaesuOpcode::SplitOff),
            Self::ReadRxStatus => opcode(YaesuOpcode::ReadRxStatus),
            Self::ReadTxStatus => opcode(YaesuOpcode::ReadTxStatus),
            Self::LockOn => opcode(YaesuOpcode::LockOn),
            Self::LockOff => opcode(YaesuOpcode::LockOff),
            Self::Unknown { bytes } => Ok(bytes.to_vec()),
        }
    }
}

/// Streaming Yaesu protocol codec for host → radio commands
pub struct YaesuCodec {
    buffer: Vec<u8>,
}

impl YaesuCodec {
    /// Create a new Yaesu codec
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(16),
        }
    }
}

impl Default for YaesuCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolCodec for YaesuCodec {
    type Command = YaesuCommand;

    fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    fn next_command(&mut self) -> Option<Self::Command> {
        self.next_command_with_bytes().map(|(cmd, _)| cmd)
    }

    fn next_command_with_bytes(&mut self) -> Option<(Self::Command, Vec<u8>)> {
        if self.buffer.len() < COMMAND_LEN {
            return None;
        }
        let bytes: Vec<u8> = self.buffer.drain(..COMMAND_LEN).collect();
        let arr: [u8; 5] = bytes.clone().try_into().ok()?;
        Some((YaesuCommand::parse(&arr), bytes))
    }

    fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Encode a frequency/mode reply
pub fn encode_freq_mode(hz: u64, mode: u8) -> Result<Vec<u8>, EncodeError> {
    FrameBuilder::new().bcd_be(hz / 10, 8).byte(mode).build()
}

/// Decode a frequency/mode reply into (Hz, raw mode byte)
pub fn decode_freq_mode(reply: &[u8]) -> Result<(u64, u8), ParseError> {
    if reply.len() != FREQ_MODE_REPLY_LEN {
        return Err(ParseError::UnexpectedLength {
            expected: FREQ_MODE_REPLY_LEN,
            actual: reply.len(),
        });
    }
    let hz = bcd_to_u64(&reply[..4])? * 10;
    Ok((hz, reply[4]))
}

/// Convert Yaesu mode byte to a normalized mode
pub fn mode_from_byte(mode: u8) -> Result<Mode, ParseError> {
    match mode {
        0x00 => Ok(Mode::Lsb),
        0x01 => Ok(Mode::Usb),
        0x02 => Ok(Mode::Cw),
        0x03 => Ok(Mode::CwR),
        0x04 => Ok(Mode::Am),
        0x06 => Ok(Mode::Wfm),
        0x08 => Ok(Mode::Fm),
        0x0A => Ok(Mode::Rtty),
        0x0C => Ok(Mode::PktFm),
        other => Err(ParseError::InvalidMode(format!("0x{:02X}", other))),
    }
}

/// Convert a normalized mode to a Yaesu mode byte
pub fn mode_to_byte(mode: Mode) -> Result<u8, EncodeError> {
    match mode {
        Mode::Lsb => Ok(0x00),
        Mode::Usb => Ok(0x01),
        Mode::Cw => Ok(0x02),
        Mode::CwR => Ok(0x03),
        Mode::Am => Ok(0x04),
        Mode::Fm => Ok(0x08),
        Mode::Rtty => Ok(0x0A),
        Mode::PktFm => Ok(0x0C),
        other => Err(EncodeError::Unsupported(format!("mode {}", other))),
    }
}

/// Signal strength in dB relative to S9 from an RX status byte
pub fn strength_from_rx_status(status: u8) -> i32 {
    let s = (status & rx_status::S_METER_MASK) as i32;
    if s < 0x0A {
        6 * s - 54
    } else {
        10 * (s - 9)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_set_frequency() {
        let encoded = YaesuCommand::SetFrequency { hz: 14_250_000 }.encode().unwrap();
        assert_eq!(encoded, vec![0x01, 0x42, 0x50, 0x00, 0x01]);
    }

    #[test]
    fn test_frequency_out_of_field() {
        assert!(YaesuCommand::SetFrequency { hz: 1_000_000_000 }
            .encode()
            .is_err());
    }

    #[test]
    fn test_parse_ptt_on() {
        let mut codec = YaesuCodec::new();
        codec.push_bytes(&[0x00, 0x00, 0x00, 0x00, 0x08]);

        let cmd = codec.next_command().unwrap();
        assert_eq!(cmd, YaesuCommand::PttOn);
    }

    #[test]
    fn test_parse_set_frequency() {
        let mut codec = YaesuCodec::new();
        codec.push_bytes(&[0x00, 0x70, 0x74, 0x00]);
        assert!(codec.next_command().is_none());
        codec.push_bytes(&[0x01]);
        assert_eq!(
            codec.next_command(),
            Some(YaesuCommand::SetFrequency { hz: 7_074_000 })
        );
    }

    #[test]
    fn test_freq_mode_reply() {
        let reply = encode_freq_mode(145_500_000, 0x08).unwrap();
        assert_eq!(reply, vec![0x14, 0x55, 0x00, 0x00, 0x08]);
        assert_eq!(decode_freq_mode(&reply).unwrap(), (145_500_000, 0x08));
        assert!(decode_freq_mode(&reply[..4]).is_err());
        assert!(decode_freq_mode(&[0xFF, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn test_strength_scale() {
        assert_eq!(strength_from_rx_status(0x00), -54);
        assert_eq!(strength_from_rx_status(0x09), 0);
        assert_eq!(strength_from_rx_status(0x0B), 20);
        assert_eq!(strength_from_rx_status(0x89), 0);
    }
}
