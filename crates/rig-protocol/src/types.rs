//! Normalized rig quantities
//!
//! These are the values that flow through the session API regardless of
//! which vendor protocol a backend speaks.

use std::fmt;
use std::str::FromStr;

use crate::error::RigError;

/// Frequency in Hz
pub type Freq = u64;

/// Passband width in Hz
pub type Width = u32;

/// Signed RIT/XIT offset in Hz
pub type Offset = i32;

/// VFO selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Vfo {
    /// Whatever VFO the session currently has selected
    Current,
    /// VFO A
    A,
    /// VFO B
    B,
    /// VFO C (a few rigs have a third VFO)
    C,
    /// Main receiver (aliases A for caching)
    Main,
    /// Sub receiver (aliases B for caching)
    Sub,
    /// Memory channel mode
    Memory,
}

impl Vfo {
    /// Returns the canonical name used by the command line tools
    pub fn name(&self) -> &'static str {
        match self {
            Self::Current => "currVFO",
            Self::A => "VFOA",
            Self::B => "VFOB",
            Self::C => "VFOC",
            Self::Main => "Main",
            Self::Sub => "Sub",
            Self::Memory => "MEM",
        }
    }

    /// Folds receiver aliases onto the VFO they share state with
    pub fn canonical(self) -> Self {
        match self {
            Self::Main => Self::A,
            Self::Sub => Self::B,
            other => other,
        }
    }

    /// The "other" VFO of an A/B pair
    pub fn other(self) -> Option<Self> {
        match self.canonical() {
            Self::A => Some(Self::B),
            Self::B => Some(Self::A),
            _ => None,
        }
    }
}

impl fmt::Display for Vfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Vfo {
    type Err = RigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CURRVFO" | "CURR" | "VFO" => Ok(Self::Current),
            "VFOA" | "A" => Ok(Self::A),
            "VFOB" | "B" => Ok(Self::B),
            "VFOC" | "C" => Ok(Self::C),
            "MAIN" => Ok(Self::Main),
            "SUB" => Ok(Self::Sub),
            "MEM" | "MEMORY" => Ok(Self::Memory),
            _ => Err(RigError::InvalidParam(format!("unknown VFO '{}'", s))),
        }
    }
}

/// Operating modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    /// Amplitude Modulation
    Am,
    /// Continuous Wave
    Cw,
    /// CW Reverse
    CwR,
    /// Upper Sideband
    Usb,
    /// Lower Sideband
    Lsb,
    /// RTTY
    Rtty,
    /// RTTY Reverse
    RttyR,
    /// Frequency Modulation
    Fm,
    /// Wide FM (broadcast)
    Wfm,
    /// Packet on LSB
    PktLsb,
    /// Packet on USB
    PktUsb,
    /// Packet on FM
    PktFm,
}

impl Mode {
    /// Every mode, in the order `dump_caps` prints them
    pub const ALL: &'static [Mode] = &[
        Mode::Am,
        Mode::Cw,
        Mode::CwR,
        Mode::Usb,
        Mode::Lsb,
        Mode::Rtty,
        Mode::RttyR,
        Mode::Fm,
        Mode::Wfm,
        Mode::PktLsb,
        Mode::PktUsb,
        Mode::PktFm,
    ];

    /// Returns the canonical name used by the command line tools
    pub fn name(&self) -> &'static str {
        match self {
            Self::Am => "AM",
            Self::Cw => "CW",
            Self::CwR => "CWR",
            Self::Usb => "USB",
            Self::Lsb => "LSB",
            Self::Rtty => "RTTY",
            Self::RttyR => "RTTYR",
            Self::Fm => "FM",
            Self::Wfm => "WFM",
            Self::PktLsb => "PKTLSB",
            Self::PktUsb => "PKTUSB",
            Self::PktFm => "PKTFM",
        }
    }

    /// Returns whether this is a sideband voice mode
    pub fn is_ssb(&self) -> bool {
        matches!(self, Self::Usb | Self::Lsb)
    }

    /// Returns whether this is a CW mode
    pub fn is_cw(&self) -> bool {
        matches!(self, Self::Cw | Self::CwR)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = RigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        Mode::ALL
            .iter()
            .copied()
            .find(|m| m.name() == upper)
            .ok_or_else(|| RigError::InvalidParam(format!("unknown mode '{}'", s)))
    }
}

/// Transmit state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Ptt {
    /// Receiving
    #[default]
    Off,
    /// Transmitting
    On,
}

impl From<bool> for Ptt {
    fn from(on: bool) -> Self {
        if on {
            Self::On
        } else {
            Self::Off
        }
    }
}

impl Ptt {
    /// Returns true while transmitting
    pub fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }
}

/// Split operation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Split {
    /// Simplex
    #[default]
    Off,
    /// Transmit on a different VFO than receive
    On,
}

impl From<bool> for Split {
    fn from(on: bool) -> Self {
        if on {
            Self::On
        } else {
            Self::Off
        }
    }
}

impl Split {
    /// Returns true when split is active
    pub fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }
}

/// AGC time constant, carried in [`Value::Int`] for [`Level::Agc`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Agc {
    Off = 0,
    Superfast = 1,
    Fast = 2,
    Slow = 3,
    Medium = 5,
}

impl Agc {
    /// Decode from the integer carried in a level value
    pub fn from_int(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::Off),
            1 => Some(Self::Superfast),
            2 => Some(Self::Fast),
            3 => Some(Self::Slow),
            5 => Some(Self::Medium),
            _ => None,
        }
    }
}

/// Adjustable or readable levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Level {
    /// Preamp gain in dB
    Preamp,
    /// Attenuator in dB
    Att,
    /// Audio gain, 0.0..=1.0
    Af,
    /// RF gain, 0.0..=1.0
    Rf,
    /// Squelch, 0.0..=1.0
    Sql,
    /// Transmit power, 0.0..=1.0
    RfPower,
    /// Microphone gain, 0.0..=1.0
    MicGain,
    /// CW keyer speed in WPM
    KeySpd,
    /// Speech compressor, 0.0..=1.0
    Comp,
    /// AGC time constant, see [`Agc`]
    Agc,
    /// VOX gain, 0.0..=1.0
    VoxGain,
    /// Noise reduction, 0.0..=1.0
    Nr,
    /// SWR (read only)
    Swr,
    /// Signal strength in dB relative to S9 (read only)
    Strength,
    /// Raw S-meter reading (read only)
    RawStr,
}

impl Level {
    /// Every level, in the order `dump_caps` prints them
    pub const ALL: &'static [Level] = &[
        Level::Preamp,
        Level::Att,
        Level::Af,
        Level::Rf,
        Level::Sql,
        Level::RfPower,
        Level::MicGain,
        Level::KeySpd,
        Level::Comp,
        Level::Agc,
        Level::VoxGain,
        Level::Nr,
        Level::Swr,
        Level::Strength,
        Level::RawStr,
    ];

    /// Returns the canonical name used by the command line tools
    pub fn name(&self) -> &'static str {
        match self {
            Self::Preamp => "PREAMP",
            Self::Att => "ATT",
            Self::Af => "AF",
            Self::Rf => "RF",
            Self::Sql => "SQL",
            Self::RfPower => "RFPOWER",
            Self::MicGain => "MICGAIN",
            Self::KeySpd => "KEYSPD",
            Self::Comp => "COMP",
            Self::Agc => "AGC",
            Self::VoxGain => "VOXGAIN",
            Self::Nr => "NR",
            Self::Swr => "SWR",
            Self::Strength => "STRENGTH",
            Self::RawStr => "RAWSTR",
        }
    }

    /// Float levels carry [`Value::Float`]; the rest carry [`Value::Int`]
    pub fn is_float(&self) -> bool {
        matches!(
            self,
            Self::Af
                | Self::Rf
                | Self::Sql
                | Self::RfPower
                | Self::MicGain
                | Self::Comp
                | Self::VoxGain
                | Self::Nr
                | Self::Swr
        )
    }

    /// Meter readings can never be set
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::Swr | Self::Strength | Self::RawStr)
    }

    /// Parse a value string in the representation this level uses
    pub fn parse_value(&self, s: &str) -> Result<Value, RigError> {
        if self.is_float() {
            s.parse::<f32>()
                .map(Value::Float)
                .map_err(|_| RigError::InvalidParam(format!("bad {} value '{}'", self, s)))
        } else {
            s.parse::<i32>()
                .map(Value::Int)
                .map_err(|_| RigError::InvalidParam(format!("bad {} value '{}'", self, s)))
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Level {
    type Err = RigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        Level::ALL
            .iter()
            .copied()
            .find(|l| l.name() == upper)
            .ok_or_else(|| RigError::InvalidParam(format!("unknown level '{}'", s)))
    }
}

/// On/off receiver and transmitter functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Func {
    /// Noise blanker
    Nb,
    /// Speech compressor
    Comp,
    /// Voice operated transmit
    Vox,
    /// CTCSS tone on transmit
    Tone,
    /// CTCSS tone squelch
    Tsql,
    /// Automatic notch filter
    Anf,
    /// Noise reduction
    Nr,
    /// Front panel lock
    Lock,
    /// Audio mute
    Mute,
    /// Automatic antenna tuner
    Tuner,
    /// Receive incremental tuning
    Rit,
    /// Transmit incremental tuning
    Xit,
}

impl Func {
    /// Every function, in the order `dump_caps` prints them
    pub const ALL: &'static [Func] = &[
        Func::Nb,
        Func::Comp,
        Func::Vox,
        Func::Tone,
        Func::Tsql,
        Func::Anf,
        Func::Nr,
        Func::Lock,
        Func::Mute,
        Func::Tuner,
        Func::Rit,
        Func::Xit,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Nb => "NB",
            Self::Comp => "COMP",
            Self::Vox => "VOX",
            Self::Tone => "TONE",
            Self::Tsql => "TSQL",
            Self::Anf => "ANF",
            Self::Nr => "NR",
            Self::Lock => "LOCK",
            Self::Mute => "MUTE",
            Self::Tuner => "TUNER",
            Self::Rit => "RIT",
            Self::Xit => "XIT",
        }
    }

    /// Bit used in a function set
    pub const fn bit(self) -> u32 {
        1 << self as u32
    }
}

impl fmt::Display for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Func {
    type Err = RigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        Func::ALL
            .iter()
            .copied()
            .find(|f| f.name() == upper)
            .ok_or_else(|| RigError::InvalidParam(format!("unknown function '{}'", s)))
    }
}

/// Rig-wide parameters, not tied to a VFO
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Parm {
    /// Display backlight, 0.0..=1.0
    Backlight,
    /// Key beep on or off
    Beep,
    /// Auto power off in minutes, 0 disables it
    Apo,
    /// Seconds since midnight on the rig clock
    Time,
    /// Battery charge, 0.0..=1.0 (read only)
    Bat,
}

impl Parm {
    /// Every parameter, in the order `dump_caps` prints them
    pub const ALL: &'static [Parm] = &[
        Parm::Backlight,
        Parm::Beep,
        Parm::Apo,
        Parm::Time,
        Parm::Bat,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Backlight => "BACKLIGHT",
            Self::Beep => "BEEP",
            Self::Apo => "APO",
            Self::Time => "TIME",
            Self::Bat => "BAT",
        }
    }

    /// Bit used in a parameter set
    pub const fn bit(self) -> u32 {
        1 << self as u32
    }

    /// Float parameters carry [`Value::Float`]; the rest carry [`Value::Int`]
    pub fn is_float(&self) -> bool {
        matches!(self, Self::Backlight | Self::Bat)
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::Bat)
    }

    pub fn parse_value(&self, s: &str) -> Result<Value, RigError> {
        let value = if self.is_float() {
            s.parse::<f32>().ok().map(Value::Float)
        } else {
            s.parse::<i32>().ok().map(Value::Int)
        };
        value.ok_or_else(|| RigError::InvalidParam(format!("bad {} value '{}'", self, s)))
    }
}

impl fmt::Display for Parm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Parm {
    type Err = RigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        Parm::ALL
            .iter()
            .copied()
            .find(|p| p.name() == upper)
            .ok_or_else(|| RigError::InvalidParam(format!("unknown parameter '{}'", s)))
    }
}

/// A level value
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Int(i32),
    Float(f32),
}

impl Value {
    /// Numeric view used for range checks
    pub fn as_f32(&self) -> f32 {
        match self {
            Self::Int(i) => *i as f32,
            Self::Float(f) => *f,
        }
    }

    /// Integer view; floats are truncated
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::Int(i) => *i,
            Self::Float(f) => *f as i32,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{:.6}", v),
        }
    }
}
