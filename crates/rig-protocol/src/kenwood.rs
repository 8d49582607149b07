//! Kenwood CAT Protocol Implementation
//!
//! The Kenwood protocol uses ASCII semicolon-terminated commands with
//! 2-letter prefixes. A bare prefix (`FA;`) is a query; a prefix with
//! parameters (`FA00014074000;`) is a set, and replies use the same form.
//!
//! A reply of `?;` means the radio rejected the command.
//!
//! # Commands used by the TS-480 backend
//! - `FA` / `FB` - VFO A / B frequency, 11 digits
//! - `MD` - Mode
//! - `FR` / `FT` - Receive / transmit VFO (0 = A, 1 = B)
//! - `TX` / `RX` - Transmit / receive
//! - `IF` - Information (status)
//! - `ID` - Radio identification
//! - `AG` / `RG` / `SQ` / `PC` - AF gain, RF gain, squelch, power
//! - `NB` / `PR` / `VX` / `NR` / `LK` / `RT` / `XT` - one digit switches
//! - `RC` / `RU` / `RD` - RIT/XIT offset clear, up, down

use crate::error::{EncodeError, ParseError};
use crate::frame::{parse_ascii_decimal, FrameBuilder};
use crate::types::Mode;
use crate::{EncodeCommand, ProtocolCodec};

/// Command terminator
pub const TERMINATOR: u8 = b';';

/// Reply meaning "command rejected"
pub const REJECTED: &[u8] = b"?;";

/// Maximum command length (reasonable limit to prevent buffer overflow)
pub const MAX_COMMAND_LEN: usize = 64;

/// Total length of an `IF` reply including prefix and terminator
pub const IF_REPLY_LEN: usize = 38;

/// Settings switched with a single digit, `NB1;` / `NB;`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KenwoodSwitch {
    NoiseBlanker,
    /// Speech processor
    Processor,
    Vox,
    /// 0 off, 1 NR1, 2 NR2
    NoiseReduction,
    Lock,
    Rit,
    Xit,
}

impl KenwoodSwitch {
    pub const ALL: &'static [KenwoodSwitch] = &[
        Self::NoiseBlanker,
        Self::Processor,
        Self::Vox,
        Self::NoiseReduction,
        Self::Lock,
        Self::Rit,
        Self::Xit,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            Self::NoiseBlanker => "NB",
            Self::Processor => "PR",
            Self::Vox => "VX",
            Self::NoiseReduction => "NR",
            Self::Lock => "LK",
            Self::Rit => "RT",
            Self::Xit => "XT",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.prefix() == prefix)
    }
}

/// Kenwood protocol command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KenwoodCommand {
    /// VFO A frequency: FA00014250000;
    FrequencyA(Option<u64>),
    /// VFO B frequency: FB00007074000;
    FrequencyB(Option<u64>),
    /// Mode: MD2;
    Mode(Option<u8>),
    /// Receive VFO: FR0;
    RxVfo(Option<u8>),
    /// Transmit VFO: FT1;
    TxVfo(Option<u8>),
    /// Transmit: TX;
    Transmit,
    /// Receive: RX;
    Receive,
    /// Information query / report
    Info(Option<KenwoodInfo>),
    /// Identification: ID020;
    Id(Option<u16>),
    /// AF gain 000-255: AG0nnn;
    AfGain(Option<u16>),
    /// RF gain 000-255: RGnnn;
    RfGain(Option<u16>),
    /// Squelch 000-255: SQ0nnn;
    Squelch(Option<u16>),
    /// Output power in watts: PCnnn;
    Power(Option<u16>),
    /// One digit switch: NB1;
    Switch(KenwoodSwitch, Option<u8>),
    /// Clear the RIT/XIT offset: RC;
    RitClear,
    /// Raise the offset by n Hz: RU00120;
    RitUp(Option<u32>),
    /// Lower the offset by n Hz: RD00120;
    RitDown(Option<u32>),
    /// Rejection reply
    Rejected,
    /// Unknown/unrecognized command
    Unknown(String),
}

/// Parsed IF (information) response data
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KenwoodInfo {
    /// Current frequency in Hz
    pub frequency_hz: u64,
    /// RIT/XIT offset
    pub rit_offset: i32,
    /// RIT enabled
    pub rit_on: bool,
    /// XIT enabled
    pub xit_on: bool,
    /// Memory channel
    pub memory_channel: u16,
    /// Transmitting
    pub tx: bool,
    /// Mode digit
    pub mode: u8,
    /// VFO (0=A, 1=B, 2=memory)
    pub vfo: u8,
    /// Scan status
    pub scan: bool,
    /// Split operation
    pub split: bool,
}

impl KenwoodInfo {
    /// Render the parameter part of an IF reply (without `IF` and `;`)
    fn params(&self) -> Result<Vec<u8>, EncodeError> {
        let sign = if self.rit_offset < 0 { b'-' } else { b'+' };
        FrameBuilder::new()
            .ascii_decimal(self.frequency_hz, 11)
            .bytes(b"     ")
            .byte(sign)
            .ascii_decimal(self.rit_offset.unsigned_abs() as u64, 4)
            .byte(b'0' + self.rit_on as u8)
            .byte(b'0' + self.xit_on as u8)
            .ascii_decimal(self.memory_channel as u64, 3)
            .byte(b'0' + self.tx as u8)
            .ascii_decimal(self.mode as u64, 1)
            .ascii_decimal(self.vfo as u64, 1)
            .byte(b'0' + self.scan as u8)
            .byte(b'0' + self.split as u8)
            .bytes(b"0000")
            .build()
    }
}

/// Streaming Kenwood protocol codec
pub struct KenwoodCodec {
    buffer: Vec<u8>,
}

impl KenwoodCodec {
    /// Create a new Kenwood codec
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(64),
        }
    }

    fn opt_number(params: &str) -> Result<Option<u64>, ParseError> {
        if params.is_empty() {
            Ok(None)
        } else {
            parse_ascii_decimal(params.as_bytes()).map(Some)
        }
    }

    /// Parse a complete command string (without terminator)
    pub fn parse_command(cmd: &str) -> Result<KenwoodCommand, ParseError> {
        if cmd == "?" {
            return Ok(KenwoodCommand::Rejected);
        }
        if cmd.len() < 2 || !cmd.is_char_boundary(2) {
            return Err(ParseError::InvalidFrame("command too short".into()));
        }

        let prefix = &cmd[..2];
        let params = &cmd[2..];

        match prefix {
            "FA" => Ok(KenwoodCommand::FrequencyA(
                Self::opt_number(params)
                    .map_err(|_| ParseError::InvalidFrequency(params.into()))?,
            )),
            "FB" => Ok(KenwoodCommand::FrequencyB(
                Self::opt_number(params)
                    .map_err(|_| ParseError::InvalidFrequency(params.into()))?,
            )),
            "MD" => Ok(KenwoodCommand::Mode(
                Self::opt_number(params)
                    .map_err(|_| ParseError::InvalidMode(params.into()))?
                    .map(|m| m as u8),
            )),
            "FR" => Ok(KenwoodCommand::RxVfo(
                Self::opt_number(params)?.map(|v| v as u8),
            )),
            "FT" => Ok(KenwoodCommand::TxVfo(
                Self::opt_number(params)?.map(|v| v as u8),
            )),
            "TX" => Ok(KenwoodCommand::Transmit),
            "RX" => Ok(KenwoodCommand::Receive),
            "IF" => {
                if params.is_empty() {
                    Ok(KenwoodCommand::Info(None))
                } else {
                    Ok(KenwoodCommand::Info(Some(Self::parse_info(params)?)))
                }
            }
            "ID" => Ok(KenwoodCommand::Id(
                Self::opt_number(params)?.map(|v| v as u16),
            )),
            "AG" => {
                // AG takes a receiver digit before the level
                let level = params.get(1..).unwrap_or("");
                Ok(KenwoodCommand::AfGain(
                    Self::opt_number(level)?.map(|v| v as u16),
                ))
            }
            "RG" => Ok(KenwoodCommand::RfGain(
                Self::opt_number(params)?.map(|v| v as u16),
            )),
            "SQ" => {
                let level = params.get(1..).unwrap_or("");
                Ok(KenwoodCommand::Squelch(
                    Self::opt_number(level)?.map(|v| v as u16),
                ))
            }
            "PC" => Ok(KenwoodCommand::Power(
                Self::opt_number(params)?.map(|v| v as u16),
            )),
            "RC" => Ok(KenwoodCommand::RitClear),
            "RU" => Ok(KenwoodCommand::RitUp(
                Self::opt_number(params)?.map(|v| v as u32),
            )),
            "RD" => Ok(KenwoodCommand::RitDown(
                Self::opt_number(params)?.map(|v| v as u32),
            )),
            _ => match KenwoodSwitch::from_prefix(prefix) {
                Some(switch) => Ok(KenwoodCommand::Switch(
                    switch,
                    Self::opt_number(params)?.map(|v| v as u8),
                )),
                None => Ok(KenwoodCommand::Unknown(cmd.to_string())),
            },
        }
    }

    /// Parse IF response parameters
    fn parse_info(params: &str) -> Result<KenwoodInfo, ParseError> {
        // IF response format (35 chars of parameters):
        // [0..11]  frequency
        // [11..16] step (skipped)
        // [16..21] RIT/XIT offset, signed
        // [21] RIT on, [22] XIT on
        // [23..26] memory channel
        // [26] TX, [27] mode, [28] VFO, [29] scan, [30] split
        // [31..35] tone settings (skipped)
        if params.len() < IF_REPLY_LEN - 3 || !params.is_ascii() {
            return Err(ParseError::UnexpectedLength {
                expected: IF_REPLY_LEN - 3,
                actual: params.len(),
            });
        }
        let b = params.as_bytes();

        let frequency_hz = parse_ascii_decimal(&b[0..11])
            .map_err(|_| ParseError::InvalidFrequency(params[0..11].into()))?;
        let rit_offset = params[16..21]
            .trim_start_matches('+')
            .parse::<i32>()
            .unwrap_or(0);
        let digit = |i: usize| b[i].wrapping_sub(b'0');

        Ok(KenwoodInfo {
            frequency_hz,
            rit_offset,
            rit_on: b[21] == b'1',
            xit_on: b[22] == b'1',
            memory_channel: parse_ascii_decimal(&b[23..26]).unwrap_or(0) as u16,
            tx: b[26] == b'1',
            mode: digit(27),
            vfo: digit(28),
            scan: b[29] == b'1',
            split: b[30] == b'1',
        })
    }
}

impl Default for KenwoodCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolCodec for KenwoodCodec {
    type Command = KenwoodCommand;

    fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);

        // Prevent buffer overflow
        if self.buffer.len() > MAX_COMMAND_LEN * 4 {
            let start = self.buffer.len() - MAX_COMMAND_LEN;
            self.buffer = self.buffer[start..].to_vec();
        }
    }

    fn next_command(&mut self) -> Option<Self::Command> {
        self.next_command_with_bytes().map(|(cmd, _)| cmd)
    }

    fn next_command_with_bytes(&mut self) -> Option<(Self::Command, Vec<u8>)> {
        let term_pos = self.buffer.iter().position(|&b| b == TERMINATOR)?;
        let cmd_bytes: Vec<u8> = self.buffer.drain(..=term_pos).collect();
        let cmd_str = String::from_utf8_lossy(&cmd_bytes[..cmd_bytes.len() - 1]);

        let cmd = match Self::parse_command(&cmd_str) {
            Ok(cmd) => cmd,
            Err(e) => {
                tracing::warn!("Failed to parse Kenwood command: {}", e);
                KenwoodCommand::Unknown(cmd_str.into_owned())
            }
        };

        Some((cmd, cmd_bytes))
    }

    fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl EncodeCommand for KenwoodCommand {
    fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        fn opt(
            frame: FrameBuilder,
            value: Option<u64>,
            width: usize,
        ) -> FrameBuilder {
            match value {
                Some(v) => frame.ascii_decimal(v, width),
                None => frame,
            }
        }

        let frame = match self {
            Self::FrequencyA(hz) => opt(FrameBuilder::new().bytes(b"FA"), *hz, 11),
            Self::FrequencyB(hz) => opt(FrameBuilder::new().bytes(b"FB"), *hz, 11),
            Self::Mode(m) => opt(FrameBuilder::new().bytes(b"MD"), m.map(u64::from), 1),
            Self::RxVfo(v) => opt(FrameBuilder::new().bytes(b"FR"), v.map(u64::from), 1),
            Self::TxVfo(v) => opt(FrameBuilder::new().bytes(b"FT"), v.map(u64::from), 1),
            Self::Transmit => FrameBuilder::new().bytes(b"TX"),
            Self::Receive => FrameBuilder::new().bytes(b"RX"),
            Self::Info(None) => FrameBuilder::new().bytes(b"IF"),
            Self::Info(Some(info)) => FrameBuilder::new().bytes(b"IF").bytes(&info.params()?),
            Self::Id(id) => opt(FrameBuilder::new().bytes(b"ID"), id.map(u64::from), 3),
            Self::AfGain(v) => opt(FrameBuilder::new().bytes(b"AG0"), v.map(u64::from), 3),
            Self::RfGain(v) => opt(FrameBuilder::new().bytes(b"RG"), v.map(u64::from), 3),
            Self::Squelch(v) => opt(FrameBuilder::new().bytes(b"SQ0"), v.map(u64::from), 3),
            Self::Power(v) => opt(FrameBuilder::new().bytes(b"PC"), v.map(u64::from), 3),
            Self::Switch(switch, v) => opt(
                FrameBuilder::new().bytes(switch.prefix().as_bytes()),
                v.map(u64::from),
                1,
            ),
            Self::RitClear => FrameBuilder::new().bytes(b"RC"),
            Self::RitUp(hz) => opt(FrameBuilder::new().bytes(b"RU"), hz.map(u64::from), 5),
            Self::RitDown(hz) => opt(FrameBuilder::new().bytes(b"RD"), hz.map(u64::from), 5),
            Self::Rejected => FrameBuilder::new().byte(b'?'),
            Self::Unknown(s) => FrameBuilder::new().bytes(s.as_bytes()),
        };
        frame.byte(TERMINATOR).build()
    }
}

/// Parse a complete reply frame (with terminator)
///
/// Fails if the frame is not terminated, and maps `?;` to
/// [`KenwoodCommand::Rejected`].
pub fn decode_reply(reply: &[u8]) -> Result<KenwoodCommand, ParseError> {
    match reply.split_last() {
        Some((&TERMINATOR, body)) => {
            let s = std::str::from_utf8(body)
                .map_err(|_| ParseError::InvalidFrame(format!("{:02X?}", body)))?;
            KenwoodCodec::parse_command(s)
        }
        _ => Err(ParseError::InvalidFrame(format!(
            "unterminated reply {:02X?}",
            reply
        ))),
    }
}

/// Convert Kenwood mode digit to a normalized mode
pub fn mode_from_digit(mode: u8) -> Result<Mode, ParseError> {
    match mode {
        1 => Ok(Mode::Lsb),
        2 => Ok(Mode::Usb),
        3 => Ok(Mode::Cw),
        4 => Ok(Mode::Fm),
        5 => Ok(Mode::Am),
        6 => Ok(Mode::Rtty),
        7 => Ok(Mode::CwR),
        9 => Ok(Mode::RttyR),
        other => Err(ParseError::InvalidMode(other.to_string())),
    }
}

/// Convert a normalized mode to a Kenwood mode digit
pub fn mode_to_digit(mode: Mode) -> Result<u8, EncodeError> {
    match mode {
        Mode::Lsb => Ok(1),
        Mode::Usb => Ok(2),
        Mode::Cw => Ok(3),
        Mode::Fm => Ok(4),
        Mode::Am => Ok(5),
        Mode::Rtty => Ok(6),
        Mode::CwR => Ok(7),
        Mode::RttyR => Ok(9),
        other => Err(EncodeError::Unsupported(format!("mode {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frequency() {
        let mut codec = KenwoodCodec::new();
        codec.push_bytes(b"FA00014250000;");

        let cmd = codec.next_command().unwrap();
        assert_eq!(cmd, KenwoodCommand::FrequencyA(Some(14_250_000)));
    }

    #[test]
    fn test_parse_query() {
        let mut codec = KenwoodCodec::new();
        codec.push_bytes(b"FA;MD;AG0;");

        assert_eq!(codec.next_command(), Some(KenwoodCommand::FrequencyA(None)));
        assert_eq!(codec.next_command(), Some(KenwoodCommand::Mode(None)));
        assert_eq!(codec.next_command(), Some(KenwoodCommand::AfGain(None)));
    }

    #[test]
    fn test_partial_data() {
        let mut codec = KenwoodCodec::new();
        codec.push_bytes(b"FA000142");
        assert!(codec.next_command().is_none());

        codec.push_bytes(b"50000;");
        assert_eq!(
            codec.next_command(),
            Some(KenwoodCommand::FrequencyA(Some(14_250_000)))
        );
    }

    #[test]
    fn test_encode() {
        assert_eq!(
            KenwoodCommand::FrequencyB(Some(7_074_000)).encode().unwrap(),
            b"FB00007074000;".to_vec()
        );
        assert_eq!(KenwoodCommand::Mode(Some(2)).encode().unwrap(), b"MD2;".to_vec());
        assert_eq!(
            KenwoodCommand::AfGain(Some(128)).encode().unwrap(),
            b"AG0128;".to_vec()
        );
        assert!(KenwoodCommand::FrequencyA(Some(100_000_000_000))
            .encode()
            .is_err());
    }

    #[test]
    fn test_info_roundtrip() {
        let info = KenwoodInfo {
            frequency_hz: 14_074_000,
            rit_offset: -120,
            tx: true,
            mode: 2,
            vfo: 1,
            split: true,
            ..Default::default()
        };
        let frame = KenwoodCommand::Info(Some(info.clone())).encode().unwrap();
        assert_eq!(frame.len(), IF_REPLY_LEN);
        assert_eq!(decode_reply(&frame).unwrap(), KenwoodCommand::Info(Some(info)));
    }

    #[test]
    fn test_rejected_reply() {
        assert_eq!(decode_reply(b"?;").unwrap(), KenwoodCommand::Rejected);
        assert!(decode_reply(b"FA00014250000").is_err());
    }

    #[test]
    fn test_switches_and_rit() {
        assert_eq!(
            decode_reply(b"NB1;").unwrap(),
            KenwoodCommand::Switch(KenwoodSwitch::NoiseBlanker, Some(1))
        );
        assert_eq!(
            decode_reply(b"XT;").unwrap(),
            KenwoodCommand::Switch(KenwoodSwitch::Xit, None)
        );
        assert_eq!(
            KenwoodCommand::Switch(KenwoodSwitch::Processor, Some(0))
                .encode()
                .unwrap(),
            b"PR0;".to_vec()
        );
        assert_eq!(
            KenwoodCommand::RitDown(Some(120)).encode().unwrap(),
            b"RD00120;".to_vec()
        );
        assert_eq!(decode_reply(b"RC;").unwrap(), KenwoodCommand::RitClear);
        assert!(KenwoodCommand::RitUp(Some(100_000)).encode().is_err());
    }

    #[test]
    fn test_mode_digits() {
        assert_eq!(mode_from_digit(2).unwrap(), Mode::Usb);
        assert_eq!(mode_to_digit(Mode::CwR).unwrap(), 7);
        assert!(mode_from_digit(8).is_err());
        assert!(mode_to_digit(Mode::PktFm).is_err());
    }
}
