//! Ten-Tec binary CAT protocol (Omni VII / Jupiter family)
//!
//! Commands are a one-byte verb (`?` query, `*` set, `#` transmit), a
//! one-letter register and an optional binary payload, followed by CR.
//!
//! # Frame Format
//! ```text
//! ?A\r                    query VFO A frequency
//! *A<b3><b2><b1><b0>\r    set VFO A frequency, 4 bytes big-endian Hz
//! A<b3><b2><b1><b0>\r     frequency reply (6 bytes)
//! ?M\r  ->  M<a><b>\r     mode of VFO A and VFO B
//! ?W\r  ->  W<idx>\r      receive filter index
//! XX\r  ->  RADIO START\r DSP reset banner
//! ```
//!
//! Payload bytes are raw binary and may themselves equal CR, so replies are
//! framed by length rather than by terminator wherever the length is known.

use crate::error::{EncodeError, ParseError};
use crate::frame::{be_uint, parse_ascii_decimal, FrameBuilder};
use crate::types::Mode;
use crate::{EncodeCommand, ProtocolCodec};

/// End-of-message byte
pub const EOM: u8 = b'\r';

/// Banner the radio prints after a DSP reset
pub const RESET_BANNER: &str = "RADIO START";

/// Length of a frequency reply: tag, four bytes, CR
pub const FREQ_REPLY_LEN: usize = 6;
/// Length of a mode reply: `M`, two mode chars, CR
pub const MODE_REPLY_LEN: usize = 4;
/// Length of a filter reply: `W`, index, CR
pub const FILTER_REPLY_LEN: usize = 3;
/// Length of a split reply: `O`, state, CR
pub const SPLIT_REPLY_LEN: usize = 3;

/// Maximum frame length the codec will buffer without finding a frame
const MAX_FRAME_LEN: usize = 64;

/// Registers reachable through `?`/`*` level commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TenTecMeter {
    /// Audio volume, `U`
    Volume,
    /// RF gain (0 = full gain), `I`
    RfGain,
    /// AGC speed, `G`
    Agc,
    /// Squelch, `H`
    Squelch,
    /// Attenuator, `J`
    Attenuator,
    /// Forward power in volts, `P`
    Power,
    /// S-meter, `S`
    Signal,
    /// Forward power meter, `F`
    Forward,
    /// Reflected power meter, `R`
    Reflected,
}

impl TenTecMeter {
    /// Register letter
    pub fn letter(&self) -> u8 {
        match self {
            Self::Volume => b'U',
            Self::RfGain => b'I',
            Self::Agc => b'G',
            Self::Squelch => b'H',
            Self::Attenuator => b'J',
            Self::Power => b'P',
            Self::Signal => b'S',
            Self::Forward => b'F',
            Self::Reflected => b'R',
        }
    }

    /// Register from its letter
    pub fn from_letter(b: u8) -> Option<Self> {
        match b {
            b'U' => Some(Self::Volume),
            b'I' => Some(Self::RfGain),
            b'G' => Some(Self::Agc),
            b'H' => Some(Self::Squelch),
            b'J' => Some(Self::Attenuator),
            b'P' => Some(Self::Power),
            b'S' => Some(Self::Signal),
            b'F' => Some(Self::Forward),
            b'R' => Some(Self::Reflected),
            _ => None,
        }
    }

    /// Full length of the reply to a query of this register
    pub fn reply_len(&self) -> usize {
        match self {
            Self::Power => 4,
            Self::Signal => 6,
            _ => 3,
        }
    }

    /// Whether the register can be written with `*`
    pub fn is_settable(&self) -> bool {
        matches!(
            self,
            Self::Volume | Self::RfGain | Self::Agc | Self::Squelch | Self::Attenuator
        )
    }
}

/// Host → radio command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenTecCommand {
    /// `?A` / `?B`
    GetFrequency { vfo: u8 },
    /// `*A<4 bytes>` / `*B<4 bytes>`
    SetFrequency { vfo: u8, hz: u32 },
    /// `?M`
    GetMode,
    /// `*M<a><b>`, mode chars for VFO A and VFO B
    SetMode { mode_a: u8, mode_b: u8 },
    /// `?W`
    GetFilter,
    /// `*W<idx>`
    SetFilter { index: u8 },
    /// `#1` / `#0`
    SetPtt(bool),
    /// `?O`
    GetSplit,
    /// `*O<0x01>` / `*O<0x00>`
    SetSplit(bool),
    /// `?<register>`
    GetMeter(TenTecMeter),
    /// `*<register><value>`
    SetMeter(TenTecMeter, u8),
    /// `?V`
    GetVersion,
    /// `XX`, DSP reset
    Reset,
    /// Anything else, kept verbatim without the terminator
    Unknown(Vec<u8>),
}

impl EncodeCommand for TenTecCommand {
    fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let frame = match self {
            Self::GetFrequency { vfo } => FrameBuilder::new().byte(b'?').byte(*vfo),
            Self::SetFrequency { vfo, hz } => {
                FrameBuilder::new().byte(b'*').byte(*vfo).u32_be(*hz)
            }
            Self::GetMode => FrameBuilder::new().bytes(b"?M"),
            Self::SetMode { mode_a, mode_b } => {
                FrameBuilder::new().bytes(b"*M").byte(*mode_a).byte(*mode_b)
            }
            Self::GetFilter => FrameBuilder::new().bytes(b"?W"),
            Self::SetFilter { index } => FrameBuilder::new().bytes(b"*W").byte(*index),
            Self::SetPtt(on) => FrameBuilder::new().byte(b'#').byte(if *on { b'1' } else { b'0' }),
            Self::GetSplit => FrameBuilder::new().bytes(b"?O"),
            Self::SetSplit(on) => FrameBuilder::new().bytes(b"*O").byte(u8::from(*on)),
            Self::GetMeter(m) => FrameBuilder::new().byte(b'?').byte(m.letter()),
            Self::SetMeter(m, value) => {
                if !m.is_settable() {
                    return Err(EncodeError::Unsupported(format!(
                        "register '{}' is read only",
                        m.letter() as char
                    )));
                }
                FrameBuilder::new().byte(b'*').byte(m.letter()).byte(*value)
            }
            Self::GetVersion => FrameBuilder::new().bytes(b"?V"),
            Self::Reset => FrameBuilder::new().bytes(b"XX"),
            Self::Unknown(bytes) => FrameBuilder::new().bytes(bytes),
        };
        frame.byte(EOM).build()
    }
}

impl TenTecCommand {
    /// Length of the reply this command produces, if it has a fixed one
    pub fn fixed_reply_len(&self) -> Option<usize> {
        match self {
            Self::GetFrequency { .. } => Some(FREQ_REPLY_LEN),
            Self::GetMode => Some(MODE_REPLY_LEN),
            Self::GetFilter => Some(FILTER_REPLY_LEN),
            Self::GetSplit => Some(SPLIT_REPLY_LEN),
            Self::GetMeter(m) => Some(m.reply_len()),
            _ => None,
        }
    }
}

/// Streaming parser for host → radio frames
///
/// Frame length is decided by the verb and register, since binary payloads
/// may contain the terminator byte.
pub struct TenTecCodec {
    buffer: Vec<u8>,
}

impl TenTecCodec {
    /// Create a new Ten-Tec codec
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(32),
        }
    }

    /// Total frame length for the buffered prefix, if it can be known yet
    fn frame_len(buf: &[u8]) -> Option<usize> {
        let verb = *buf.first()?;
        let reg = *buf.get(1)?;
        match (verb, reg) {
            (b'*', b'A') | (b'*', b'B') => Some(7),
            (b'*', b'M') => Some(5),
            (b'*', b'W') | (b'*', b'O') => Some(4),
            (b'*', r) if TenTecMeter::from_letter(r).is_some() => Some(4),
            _ => buf.iter().position(|&b| b == EOM).map(|p| p + 1),
        }
    }

    fn parse_frame(frame: &[u8]) -> TenTecCommand {
        let body = &frame[..frame.len() - 1];
        match body {
            [b'?', v @ (b'A' | b'B')] => TenTecCommand::GetFrequency { vfo: *v },
            [b'*', v @ (b'A' | b'B'), b0, b1, b2, b3] => TenTecCommand::SetFrequency {
                vfo: *v,
                hz: u32::from_be_bytes([*b0, *b1, *b2, *b3]),
            },
            [b'?', b'M'] => TenTecCommand::GetMode,
            [b'*', b'M', a, b] => TenTecCommand::SetMode {
                mode_a: *a,
                mode_b: *b,
            },
            [b'?', b'W'] => TenTecCommand::GetFilter,
            [b'*', b'W', idx] => TenTecCommand::SetFilter { index: *idx },
            [b'#', b'1'] => TenTecCommand::SetPtt(true),
            [b'#', b'0'] => TenTecCommand::SetPtt(false),
            [b'?', b'O'] => TenTecCommand::GetSplit,
            [b'*', b'O', state] => TenTecCommand::SetSplit(*state != 0),
            [b'?', b'V'] => TenTecCommand::GetVersion,
            [b'X', b'X'] => TenTecCommand::Reset,
            [b'?', r] => match TenTecMeter::from_letter(*r) {
                Some(m) => TenTecCommand::GetMeter(m),
                None => TenTecCommand::Unknown(body.to_vec()),
            },
            [b'*', r, value] => match TenTecMeter::from_letter(*r) {
                Some(m) => TenTecCommand::SetMeter(m, *value),
                None => TenTecCommand::Unknown(body.to_vec()),
            },
            _ => TenTecCommand::Unknown(body.to_vec()),
        }
    }
}

impl Default for TenTecCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolCodec for TenTecCodec {
    type Command = TenTecCommand;

    fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    fn next_command(&mut self) -> Option<Self::Command> {
        self.next_command_with_bytes().map(|(cmd, _)| cmd)
    }

    fn next_command_with_bytes(&mut self) -> Option<(Self::Command, Vec<u8>)> {
        let Some(len) = Self::frame_len(&self.buffer) else {
            if self.buffer.len() > MAX_FRAME_LEN {
                tracing::warn!("discarding {} unframed Ten-Tec bytes", self.buffer.len());
                self.buffer.clear();
            }
            return None;
        };
        if self.buffer.len() < len {
            return None;
        }
        let bytes: Vec<u8> = self.buffer.drain(..len).collect();
        if bytes.last() != Some(&EOM) {
            tracing::warn!("Ten-Tec frame without terminator: {:02X?}", bytes);
            return Some((TenTecCommand::Unknown(bytes.clone()), bytes));
        }
        Some((Self::parse_frame(&bytes), bytes))
    }

    fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Radio → host reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenTecReply {
    Frequency { vfo: u8, hz: u32 },
    Mode { mode_a: u8, mode_b: u8 },
    Filter { index: u8 },
    Split(bool),
    /// One-byte register reading (`U`, `I`, `G`, `H`, `J`, `F`, `R`)
    Meter(TenTecMeter, u8),
    /// Forward power, `P<v><x>\r`
    Power(u8),
    /// S-meter, `S<s units 2 digits><dB over 2 digits>\r`
    Signal { s_units: u8, over_db: u8 },
    /// Version string, `VER ...\r`
    Version(String),
    /// Reset banner
    Banner,
}

impl EncodeCommand for TenTecReply {
    fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let frame = match self {
            Self::Frequency { vfo, hz } => FrameBuilder::new().byte(*vfo).u32_be(*hz),
            Self::Mode { mode_a, mode_b } => {
                FrameBuilder::new().byte(b'M').byte(*mode_a).byte(*mode_b)
            }
            Self::Filter { index } => FrameBuilder::new().byte(b'W').byte(*index),
            Self::Split(on) => FrameBuilder::new().byte(b'O').byte(u8::from(*on)),
            Self::Meter(m, v) => FrameBuilder::new().byte(m.letter()).byte(*v),
            Self::Power(v) => FrameBuilder::new().byte(b'P').byte(*v).byte(0),
            Self::Signal { s_units, over_db } => FrameBuilder::new()
                .byte(b'S')
                .ascii_decimal(*s_units as u64, 2)
                .ascii_decimal(*over_db as u64, 2),
            Self::Version(v) => FrameBuilder::new().bytes(v.as_bytes()),
            Self::Banner => FrameBuilder::new().bytes(RESET_BANNER.as_bytes()),
        };
        frame.byte(EOM).build()
    }
}

/// Check the tag byte and total length of a fixed-length reply
pub fn check_reply(reply: &[u8], tag: u8, len: usize) -> Result<(), ParseError> {
    if reply.first() != Some(&tag) {
        return Err(ParseError::UnexpectedTag {
            expected: vec![tag],
            actual: reply.iter().take(1).copied().collect(),
        });
    }
    if reply.len() != len {
        return Err(ParseError::UnexpectedLength {
            expected: len,
            actual: reply.len(),
        });
    }
    Ok(())
}

/// Decode `<vfo><b3><b2><b1><b0>\r`
pub fn decode_frequency(reply: &[u8], vfo: u8) -> Result<u64, ParseError> {
    check_reply(reply, vfo, FREQ_REPLY_LEN)?;
    be_uint(&reply[1..5])
}

/// Decode `M<a><b>\r` into the raw mode chars for VFO A and VFO B
pub fn decode_mode(reply: &[u8]) -> Result<(u8, u8), ParseError> {
    check_reply(reply, b'M', MODE_REPLY_LEN)?;
    Ok((reply[1], reply[2]))
}

/// Decode `W<idx>\r`
pub fn decode_filter(reply: &[u8]) -> Result<u8, ParseError> {
    check_reply(reply, b'W', FILTER_REPLY_LEN)?;
    Ok(reply[1])
}

/// Decode `O<state>\r`
pub fn decode_split(reply: &[u8]) -> Result<bool, ParseError> {
    check_reply(reply, b'O', SPLIT_REPLY_LEN)?;
    Ok(reply[1] != 0)
}

/// Decode the single data byte of a register reading
pub fn decode_meter(reply: &[u8], meter: TenTecMeter) -> Result<u8, ParseError> {
    check_reply(reply, meter.letter(), meter.reply_len())?;
    Ok(reply[1])
}

/// Decode an S-meter reply into dB relative to S9
///
/// `S0944` is S9 plus 44 dB; `S0500` is S5, 24 dB below S9.
pub fn decode_signal(reply: &[u8]) -> Result<i32, ParseError> {
    check_reply(reply, b'S', TenTecMeter::Signal.reply_len())?;
    let s_units = parse_ascii_decimal(&reply[1..3])? as i32;
    let over = parse_ascii_decimal(&reply[3..5])? as i32;
    Ok(s_units * 6 - 54 + over)
}

/// Mode char for a normalized mode
pub fn mode_to_char(mode: Mode) -> Result<u8, EncodeError> {
    match mode {
        Mode::Am => Ok(b'0'),
        Mode::Usb => Ok(b'1'),
        Mode::Lsb => Ok(b'2'),
        Mode::Cw => Ok(b'3'),
        Mode::Fm => Ok(b'4'),
        Mode::CwR => Ok(b'5'),
        other => Err(EncodeError::Unsupported(format!("mode {}", other))),
    }
}

/// Normalized mode for a mode char
pub fn char_to_mode(c: u8) -> Result<Mode, ParseError> {
    match c {
        b'0' => Ok(Mode::Am),
        b'1' => Ok(Mode::Usb),
        b'2' => Ok(Mode::Lsb),
        b'3' => Ok(Mode::Cw),
        b'4' => Ok(Mode::Fm),
        b'5' => Ok(Mode::CwR),
        other => Err(ParseError::InvalidMode(format!("0x{:02X}", other))),
    }
}

/// AGC char for an [`crate::types::Agc`] value
pub fn agc_to_char(agc: crate::types::Agc) -> Result<u8, EncodeError> {
    use crate::types::Agc;
    match agc {
        Agc::Off => Ok(b'0'),
        Agc::Slow => Ok(b'1'),
        Agc::Medium => Ok(b'2'),
        Agc::Fast => Ok(b'3'),
        Agc::Superfast => Err(EncodeError::Unsupported("AGC superfast".into())),
    }
}

/// [`crate::types::Agc`] value for an AGC char
pub fn char_to_agc(c: u8) -> Result<crate::types::Agc, ParseError> {
    use crate::types::Agc;
    match c {
        b'0' => Ok(Agc::Off),
        b'1' => Ok(Agc::Slow),
        b'2' => Ok(Agc::Medium),
        b'3' => Ok(Agc::Fast),
        other => Err(ParseError::InvalidFrame(format!("AGC code 0x{:02X}", other))),
    }
}

/// Omni VII receive filter widths, widest first
pub const TT588_FILTERS: &[u32] = &[
    12000, 9000, 8000, 7500, 7000, 6500, 6000, 5500, 5000, 4500, 4000, 3800, 3600, 3400, 3200,
    3000, 2800, 2600, 2500, 2400, 2200, 2000, 1800, 1600, 1400, 1200, 1000, 900, 800, 700, 600,
    500, 450, 400, 350, 300, 250, 200,
];

/// Jupiter receive filter widths, widest first
pub const TT538_FILTERS: &[u32] = &[
    8000, 6000, 5700, 5400, 5100, 4800, 4500, 4200, 3900, 3600, 3300, 3000, 2850, 2700, 2550,
    2400, 2250, 2100, 1950, 1800, 1650, 1500, 1350, 1200, 1050, 900, 750, 675, 600, 525, 450,
    375, 330, 300,
];
