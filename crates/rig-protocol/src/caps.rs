//! Static per-model capability tables
//!
//! Each model is described by one immutable [`RigCaps`] record that lives for
//! the whole program. Sessions consult it to validate arguments locally,
//! without touching the device.

use std::fmt;
use std::str::FromStr;

use crate::error::RigError;
use crate::types::{Freq, Func, Level, Mode, Offset, Parm, Value, Vfo, Width};

/// Primitive operations a backend can implement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    GetFreq,
    SetFreq,
    GetMode,
    SetMode,
    GetVfo,
    SetVfo,
    GetPtt,
    SetPtt,
    GetSplitVfo,
    SetSplitVfo,
    GetSplitFreq,
    SetSplitFreq,
    GetSplitMode,
    SetSplitMode,
    GetLevel,
    SetLevel,
    GetFunc,
    SetFunc,
    GetParm,
    SetParm,
    GetRit,
    SetRit,
    GetXit,
    SetXit,
    GetInfo,
    Reset,
}

impl Op {
    /// Every operation, in table order
    pub const ALL: &'static [Op] = &[
        Op::GetFreq,
        Op::SetFreq,
        Op::GetMode,
        Op::SetMode,
        Op::GetVfo,
        Op::SetVfo,
        Op::GetPtt,
        Op::SetPtt,
        Op::GetSplitVfo,
        Op::SetSplitVfo,
        Op::GetSplitFreq,
        Op::SetSplitFreq,
        Op::GetSplitMode,
        Op::SetSplitMode,
        Op::GetLevel,
        Op::SetLevel,
        Op::GetFunc,
        Op::SetFunc,
        Op::GetParm,
        Op::SetParm,
        Op::GetRit,
        Op::SetRit,
        Op::GetXit,
        Op::SetXit,
        Op::GetInfo,
        Op::Reset,
    ];

    /// Long command name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetFreq => "get_freq",
            Self::SetFreq => "set_freq",
            Self::GetMode => "get_mode",
            Self::SetMode => "set_mode",
            Self::GetVfo => "get_vfo",
            Self::SetVfo => "set_vfo",
            Self::GetPtt => "get_ptt",
            Self::SetPtt => "set_ptt",
            Self::GetSplitVfo => "get_split_vfo",
            Self::SetSplitVfo => "set_split_vfo",
            Self::GetSplitFreq => "get_split_freq",
            Self::SetSplitFreq => "set_split_freq",
            Self::GetSplitMode => "get_split_mode",
            Self::SetSplitMode => "set_split_mode",
            Self::GetFunc => "get_func",
            Self::SetFunc => "set_func",
            Self::GetParm => "get_parm",
            Self::SetParm => "set_parm",
            Self::GetRit => "get_rit",
            Self::SetRit => "set_rit",
            Self::GetXit => "get_xit",
            Self::SetXit => "set_xit",
            Self::GetLevel => "get_level",
            Self::SetLevel => "set_level",
            Self::GetInfo => "get_info",
            Self::Reset => "reset",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Op {
    type Err = RigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Op::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| RigError::NotAvailable(format!("unknown operation '{}'", s)))
    }
}

/// Development status of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigStatus {
    Alpha,
    Untested,
    Beta,
    Stable,
}

/// Kind of device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigType {
    Transceiver,
    Receiver,
    Other,
}

/// How the device is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortType {
    /// No port at all (dummy models)
    None,
    Serial,
    Network,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handshake {
    None,
    Software,
    Hardware,
}

/// Port parameters and default timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortCaps {
    pub port_type: PortType,
    pub serial_rate_min: u32,
    pub serial_rate_max: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: Parity,
    pub handshake: Handshake,
    /// Delay between bytes of a frame, in ms
    pub write_delay_ms: u64,
    /// Delay after the last byte of a frame, in ms
    pub post_write_delay_ms: u64,
    /// Per-byte read timeout, in ms
    pub timeout_ms: u64,
    /// Retries after the first attempt
    pub retry: u32,
}

impl PortCaps {
    /// Port record for models that have no port
    pub const NONE: PortCaps = PortCaps {
        port_type: PortType::None,
        serial_rate_min: 0,
        serial_rate_max: 0,
        data_bits: 0,
        stop_bits: 0,
        parity: Parity::None,
        handshake: Handshake::None,
        write_delay_ms: 0,
        post_write_delay_ms: 0,
        timeout_ms: 0,
        retry: 0,
    };
}

/// Which operations may address a VFO other than the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Targetable {
    pub freq: bool,
    pub mode: bool,
}

/// Frequency range with the modes, power and VFOs valid inside it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreqRange {
    pub start: Freq,
    pub end: Freq,
    pub modes: &'static [Mode],
    /// Minimum TX power in mW, `None` for receive ranges
    pub low_power_mw: Option<u32>,
    /// Maximum TX power in mW, `None` for receive ranges
    pub high_power_mw: Option<u32>,
    pub vfos: &'static [Vfo],
    /// Bit mask of antenna ports
    pub antennas: u8,
}

impl FreqRange {
    /// Inclusive containment test
    pub fn contains(&self, freq: Freq) -> bool {
        freq >= self.start && freq <= self.end
    }
}

/// Tuning step available in a set of modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TuningStep {
    pub modes: &'static [Mode],
    pub step: Freq,
}

/// Passband available in a set of modes; 0 means "any other width"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSpec {
    pub modes: &'static [Mode],
    pub width: Width,
}

/// Level bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Granularity {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl Granularity {
    /// The default bounds for float levels
    pub const UNIT: Granularity = Granularity {
        min: 0.0,
        max: 1.0,
        step: 0.0,
    };

    /// Relative slack allowed when matching a float to a step
    const STEP_TOLERANCE: f32 = 1e-3;

    /// Checks `value` lies in `min..=max` on a whole number of steps from
    /// `min`; a step of 0 allows any value in range
    pub fn check(&self, name: &str, value: Value) -> Result<(), RigError> {
        let v = value.as_f32();
        if !v.is_finite() {
            return Err(RigError::InvalidParam(format!("{} {} is not a number", name, value)));
        }
        if v < self.min || v > self.max {
            return Err(RigError::OutOfRange(format!(
                "{} {} outside {}..={}",
                name, value, self.min, self.max
            )));
        }
        if self.step > 0.0 {
            let steps = (v - self.min) / self.step;
            if (steps - steps.round()).abs() > Self::STEP_TOLERANCE {
                return Err(RigError::OutOfRange(format!(
                    "{} {} is not a multiple of {} from {}",
                    name, value, self.step, self.min
                )));
            }
        }
        Ok(())
    }
}

/// Bit set of [`Func`]s
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FuncSet(u32);

impl FuncSet {
    pub const EMPTY: FuncSet = FuncSet(0);

    pub const fn of(funcs: &[Func]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < funcs.len() {
            bits |= funcs[i].bit();
            i += 1;
        }
        FuncSet(bits)
    }

    pub fn contains(&self, func: Func) -> bool {
        self.0 & func.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Func> + '_ {
        Func::ALL.iter().copied().filter(|f| self.contains(*f))
    }
}

/// Bit set of [`Parm`]s
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParmSet(u32);

impl ParmSet {
    pub const EMPTY: ParmSet = ParmSet(0);

    pub const fn of(parms: &[Parm]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < parms.len() {
            bits |= parms[i].bit();
            i += 1;
        }
        ParmSet(bits)
    }

    pub fn contains(&self, parm: Parm) -> bool {
        self.0 & parm.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Parm> + '_ {
        Parm::ALL.iter().copied().filter(|p| self.contains(*p))
    }
}

/// Kind of memory channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Memory,
    Edge,
    CallChannel,
}

/// Contiguous range of memory channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelRange {
    pub start: u32,
    pub end: u32,
    pub kind: ChannelKind,
}

/// Index ↔ bandwidth table for rigs that select filters by number
///
/// Entries are listed widest first, so index 0 is the widest filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterTable {
    pub widths: &'static [Width],
}

impl FilterTable {
    /// Bandwidth of the filter at `index`
    pub fn width_for_index(&self, index: usize) -> Option<Width> {
        self.widths.get(index).copied()
    }

    /// Index of the narrowest filter at least as wide as `width`
    ///
    /// Requests wider than every entry fall back to index 0.
    pub fn index_for_width(&self, width: Width) -> usize {
        self.widths
            .iter()
            .enumerate()
            .rev()
            .find(|(_, w)| width <= **w)
            .map(|(i, _)| i)
            .unwrap_or(0)
    }
}

/// Immutable description of one rig model
#[derive(Debug, Clone, Copy)]
pub struct RigCaps {
    pub model: u32,
    pub model_name: &'static str,
    pub manufacturer: &'static str,
    pub version: &'static str,
    pub status: RigStatus,
    pub rig_type: RigType,
    pub port: PortCaps,
    /// Operations the backend implements
    pub ops: &'static [Op],
    pub targetable: Targetable,
    pub modes: &'static [Mode],
    pub vfos: &'static [Vfo],
    pub get_levels: &'static [Level],
    pub set_levels: &'static [Level],
    /// Explicit bounds; float levels not listed default to 0.0..=1.0
    pub level_gran: &'static [(Level, Granularity)],
    /// Preamp settings in dB
    pub preamp: &'static [i32],
    /// Attenuator settings in dB
    pub attenuator: &'static [i32],
    pub get_funcs: FuncSet,
    pub set_funcs: FuncSet,
    pub get_parms: ParmSet,
    pub set_parms: ParmSet,
    /// Explicit bounds; float parameters not listed default to 0.0..=1.0
    pub parm_gran: &'static [(Parm, Granularity)],
    /// Largest RIT offset magnitude in Hz, 0 if the rig has none
    pub max_rit: Offset,
    pub max_xit: Offset,
    pub rx_ranges: &'static [FreqRange],
    pub tx_ranges: &'static [FreqRange],
    pub tuning_steps: &'static [TuningStep],
    /// Ordered filter list; the first entry for a mode is its normal passband
    pub filters: &'static [FilterSpec],
    pub channels: &'static [ChannelRange],
}

impl RigCaps {
    /// Returns whether the backend implements `op`
    pub fn has_op(&self, op: Op) -> bool {
        self.ops.contains(&op)
    }

    /// Look up an operation by its long name
    pub fn lookup(&self, name: &str) -> Result<Op, RigError> {
        let op: Op = name.parse()?;
        if self.has_op(op) {
            Ok(op)
        } else {
            Err(RigError::NotAvailable(format!(
                "{} on {} {}",
                op, self.manufacturer, self.model_name
            )))
        }
    }

    /// Fails with [`RigError::NotAvailable`] if `op` is not implemented
    pub fn require(&self, op: Op) -> Result<(), RigError> {
        if self.has_op(op) {
            Ok(())
        } else {
            Err(RigError::NotAvailable(op.as_str().to_string()))
        }
    }

    /// Returns whether `freq` falls inside any RX or TX range
    pub fn freq_in_range(&self, freq: Freq) -> bool {
        self.rx_ranges
            .iter()
            .chain(self.tx_ranges.iter())
            .any(|r| r.contains(freq))
    }

    pub fn supports_mode(&self, mode: Mode) -> bool {
        self.modes.contains(&mode)
    }

    /// VFO check; `Current` is always accepted and Main/Sub match A/B
    pub fn supports_vfo(&self, vfo: Vfo) -> bool {
        vfo == Vfo::Current
            || self.vfos.contains(&vfo)
            || self.vfos.contains(&vfo.canonical())
    }

    pub fn can_get_level(&self, level: Level) -> bool {
        self.get_levels.contains(&level)
    }

    pub fn can_set_level(&self, level: Level) -> bool {
        self.set_levels.contains(&level)
    }

    /// Bounds for `level`, if it has any
    pub fn granularity(&self, level: Level) -> Option<Granularity> {
        self.level_gran
            .iter()
            .find(|(l, _)| *l == level)
            .map(|(_, g)| *g)
            .or_else(|| level.is_float().then_some(Granularity::UNIT))
    }

    /// Validate a value for `set_level`
    pub fn check_level(&self, level: Level, value: Value) -> Result<(), RigError> {
        if !self.can_set_level(level) {
            return Err(RigError::NotAvailable(format!("set_level {}", level)));
        }
        match (level.is_float(), value) {
            (true, Value::Float(_)) | (false, Value::Int(_)) => {}
            _ => {
                return Err(RigError::InvalidParam(format!(
                    "wrong value type for {}",
                    level
                )))
            }
        }
        match level {
            Level::Preamp if !self.preamp.contains(&value.as_i32()) && value.as_i32() != 0 => {
                return Err(RigError::OutOfRange(format!(
                    "preamp {} dB not in {:?}",
                    value, self.preamp
                )))
            }
            Level::Att if !self.attenuator.contains(&value.as_i32()) && value.as_i32() != 0 => {
                return Err(RigError::OutOfRange(format!(
                    "attenuator {} dB not in {:?}",
                    value, self.attenuator
                )))
            }
            _ => {}
        }
        if let Some(g) = self.granularity(level) {
            g.check(level.name(), value)?;
        }
        Ok(())
    }

    pub fn can_get_func(&self, func: Func) -> bool {
        self.get_funcs.contains(func)
    }

    pub fn can_set_func(&self, func: Func) -> bool {
        self.set_funcs.contains(func)
    }

    pub fn can_get_parm(&self, parm: Parm) -> bool {
        self.get_parms.contains(parm)
    }

    pub fn can_set_parm(&self, parm: Parm) -> bool {
        self.set_parms.contains(parm)
    }

    /// Validate a value for `set_parm`
    pub fn check_parm(&self, parm: Parm, value: Value) -> Result<(), RigError> {
        if !self.can_set_parm(parm) {
            return Err(RigError::NotAvailable(format!("set_parm {}", parm)));
        }
        match (parm.is_float(), value) {
            (true, Value::Float(_)) | (false, Value::Int(_)) => {}
            _ => {
                return Err(RigError::InvalidParam(format!(
                    "wrong value type for {}",
                    parm
                )))
            }
        }
        let gran = self
            .parm_gran
            .iter()
            .find(|(p, _)| *p == parm)
            .map(|(_, g)| *g)
            .or_else(|| parm.is_float().then_some(Granularity::UNIT));
        match gran {
            Some(g) => g.check(parm.name(), value),
            None => Ok(()),
        }
    }

    /// Checks a RIT or XIT offset against the model's limit
    pub fn check_offset(&self, op: Op, offset: Offset) -> Result<(), RigError> {
        let max = match op {
            Op::SetXit => self.max_xit,
            _ => self.max_rit,
        };
        if offset.unsigned_abs() > max.unsigned_abs() {
            return Err(RigError::OutOfRange(format!(
                "{} {} Hz beyond ±{} Hz",
                op, offset, max
            )));
        }
        Ok(())
    }

    /// Normal passband for `mode`, or `None` if the model lists no filter
    pub fn passband_normal(&self, mode: Mode) -> Option<Width> {
        self.filters
            .iter()
            .find(|f| f.modes.contains(&mode))
            .map(|f| f.width)
    }

    /// Returns whether an operation may address `vfo` directly
    pub fn is_targetable(&self, op: Op) -> bool {
        match op {
            Op::GetFreq | Op::SetFreq => self.targetable.freq,
            Op::GetMode | Op::SetMode => self.targetable.mode,
            _ => false,
        }
    }
}
