//! In-memory rig with no port
//!
//! Every operation succeeds against local state, which makes the dummy
//! useful for exercising the command line and the daemon without hardware.

use std::collections::{HashMap, HashSet};

use rig_core::{RigBackend, RigIo};
use rig_protocol::caps::{
    ChannelKind, ChannelRange, FilterSpec, FuncSet, Granularity, Op, ParmSet, PortCaps, RigCaps,
    RigStatus, RigType, Targetable, TuningStep,
};
use rig_protocol::{
    Agc, Freq, Func, Level, Mode, Offset, Parm, Ptt, RigError, Split, Value, Vfo, Width,
};
use tracing::{debug, info};

use crate::ranges::{rx_range, tx_range};

const VFOS: &[Vfo] = &[Vfo::A, Vfo::B, Vfo::C];

const SSB: &[Mode] = &[Mode::Usb, Mode::Lsb];
const CW: &[Mode] = &[Mode::Cw, Mode::CwR];
const RTTY: &[Mode] = &[Mode::Rtty, Mode::RttyR];
const AM: &[Mode] = &[Mode::Am];
const FM: &[Mode] = &[Mode::Fm, Mode::PktFm];

const SETTABLE_LEVELS: &[Level] = &[
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
];

const ALL_FUNCS: FuncSet = FuncSet::of(&[
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
]);

pub const DUMMY_CAPS: RigCaps = RigCaps {
    model: 1,
    model_name: "Dummy",
    manufacturer: "Generic",
    version: "20221128.0",
    status: RigStatus::Stable,
    rig_type: RigType::Other,
    port: PortCaps::NONE,
    ops: Op::ALL,
    targetable: Targetable {
        freq: true,
        mode: true,
    },
    modes: Mode::ALL,
    vfos: VFOS,
    get_levels: Level::ALL,
    set_levels: SETTABLE_LEVELS,
    level_gran: &[
        (
            Level::KeySpd,
            Granularity {
                min: 1.0,
                max: 60.0,
                step: 1.0,
            },
        ),
        (
            Level::Agc,
            Granularity {
                min: 0.0,
                max: 5.0,
                step: 1.0,
            },
        ),
    ],
    preamp: &[10],
    attenuator: &[10, 20, 30],
    get_funcs: ALL_FUNCS,
    set_funcs: ALL_FUNCS,
    get_parms: ParmSet::of(&[Parm::Backlight, Parm::Beep, Parm::Apo, Parm::Time, Parm::Bat]),
    set_parms: ParmSet::of(&[Parm::Backlight, Parm::Beep, Parm::Apo, Parm::Time]),
    parm_gran: &[
        (
            Parm::Beep,
            Granularity {
                min: 0.0,
                max: 1.0,
                step: 1.0,
            },
        ),
        (
            Parm::Apo,
            Granularity {
                min: 0.0,
                max: 180.0,
                step: 30.0,
            },
        ),
        (
            Parm::Time,
            Granularity {
                min: 0.0,
                max: 86_399.0,
                step: 1.0,
            },
        ),
    ],
    max_rit: 9990,
    max_xit: 9990,
    rx_ranges: &[rx_range(150_000, 1_500_000_000, Mode::ALL, VFOS, 0b1111)],
    tx_ranges: &[tx_range(
        150_000,
        1_500_000_000,
        Mode::ALL,
        5_000,
        100_000,
        VFOS,
        0b1111,
    )],
    tuning_steps: &[
        TuningStep {
            modes: Mode::ALL,
            step: 1,
        },
        TuningStep {
            modes: Mode::ALL,
            step: 0,
        },
    ],
    filters: &[
        FilterSpec { modes: SSB, width: 2400 },
        FilterSpec { modes: SSB, width: 1800 },
        FilterSpec { modes: SSB, width: 3000 },
        FilterSpec { modes: CW, width: 500 },
        FilterSpec { modes: CW, width: 2400 },
        FilterSpec { modes: CW, width: 50 },
        FilterSpec { modes: RTTY, width: 300 },
        FilterSpec { modes: RTTY, width: 2400 },
        FilterSpec { modes: RTTY, width: 50 },
        FilterSpec { modes: AM, width: 8000 },
        FilterSpec { modes: AM, width: 2400 },
        FilterSpec { modes: AM, width: 10000 },
        FilterSpec { modes: FM, width: 15000 },
        FilterSpec { modes: FM, width: 8000 },
        FilterSpec { modes: &[Mode::Wfm], width: 230000 },
        FilterSpec { modes: &[Mode::PktLsb, Mode::PktUsb], width: 2400 },
    ],
    channels: &[
        ChannelRange {
            start: 0,
            end: 18,
            kind: ChannelKind::Memory,
        },
        ChannelRange {
            start: 19,
            end: 19,
            kind: ChannelKind::CallChannel,
        },
        ChannelRange {
            start: 20,
            end: 21,
            kind: ChannelKind::Edge,
        },
    ],
};

#[derive(Debug, Clone, Copy, PartialEq)]
struct VfoState {
    freq: Freq,
    mode: Mode,
    width: Width,
    tx_freq: Freq,
    tx_mode: Mode,
    tx_width: Width,
    rit: Offset,
    xit: Offset,
}

/// Dummy rig state
#[derive(Debug, Clone)]
pub struct Dummy {
    vfo: Vfo,
    vfos: HashMap<Vfo, VfoState>,
    ptt: Ptt,
    split: Split,
    tx_vfo: Vfo,
    levels: HashMap<Level, Value>,
    funcs: HashSet<Func>,
    parms: HashMap<Parm, Value>,
}

fn default_level(level: Level) -> Value {
    match level {
        Level::Af | Level::MicGain | Level::VoxGain => Value::Float(0.5),
        Level::Rf | Level::RfPower => Value::Float(1.0),
        Level::Sql | Level::Comp | Level::Nr => Value::Float(0.0),
        Level::Swr => Value::Float(1.0),
        Level::KeySpd => Value::Int(20),
        Level::Agc => Value::Int(Agc::Slow as i32),
        Level::Strength => Value::Int(-20),
        Level::RawStr => Value::Int(34),
        Level::Preamp | Level::Att => Value::Int(0),
    }
}

fn default_parm(parm: Parm) -> Value {
    match parm {
        Parm::Backlight => Value::Float(0.5),
        Parm::Bat => Value::Float(1.0),
        Parm::Beep => Value::Int(1),
        Parm::Apo | Parm::Time => Value::Int(0),
    }
}

impl Dummy {
    pub fn new() -> Self {
        let fm = |freq| VfoState {
            freq,
            mode: Mode::Fm,
            width: 15000,
            tx_freq: freq,
            tx_mode: Mode::Fm,
            tx_width: 15000,
            rit: 0,
            xit: 0,
        };
        let vfos = HashMap::from([
            (Vfo::A, fm(145_000_000)),
            (Vfo::B, fm(146_000_000)),
            (Vfo::C, fm(145_000_000)),
        ]);
        let levels = Level::ALL.iter().map(|&l| (l, default_level(l))).collect();
        Self {
            vfo: Vfo::A,
            vfos,
            ptt: Ptt::Off,
            split: Split::Off,
            tx_vfo: Vfo::A,
            levels,
            funcs: HashSet::new(),
            parms: Parm::ALL.iter().map(|&p| (p, default_parm(p))).collect(),
        }
    }

    fn slot(&mut self, vfo: Vfo) -> Result<&mut VfoState, RigError> {
        let vfo = match vfo {
            Vfo::Current => self.vfo,
            other => other.canonical(),
        };
        self.vfos
            .get_mut(&vfo)
            .ok_or_else(|| RigError::InvalidParam(format!("{} on dummy", vfo)))
    }
}

impl Default for Dummy {
    fn default() -> Self {
        Self::new()
    }
}

impl RigBackend for Dummy {
    fn caps(&self) -> &'static RigCaps {
        &DUMMY_CAPS
    }

    fn open(&mut self, _io: &mut RigIo) -> Result<(), RigError> {
        info!("Dummy rig ready");
        Ok(())
    }

    fn get_freq(&mut self, _io: &mut RigIo, vfo: Vfo) -> Result<Freq, RigError> {
        Ok(self.slot(vfo)?.freq)
    }

    fn set_freq(&mut self, _io: &mut RigIo, vfo: Vfo, freq: Freq) -> Result<(), RigError> {
        debug!("Dummy {} -> {} Hz", vfo, freq);
        self.slot(vfo)?.freq = freq;
        Ok(())
    }

    fn get_mode(&mut self, _io: &mut RigIo, vfo: Vfo) -> Result<(Mode, Width), RigError> {
        let slot = self.slot(vfo)?;
        Ok((slot.mode, slot.width))
    }

    fn set_mode(
        &mut self,
        _io: &mut RigIo,
        vfo: Vfo,
        mode: Mode,
        width: Width,
    ) -> Result<(), RigError> {
        let slot = self.slot(vfo)?;
        slot.mode = mode;
        slot.width = width;
        Ok(())
    }

    fn get_vfo(&mut self, _io: &mut RigIo) -> Result<Vfo, RigError> {
        Ok(self.vfo)
    }

    fn set_vfo(&mut self, _io: &mut RigIo, vfo: Vfo) -> Result<(), RigError> {
        self.slot(vfo)?;
        if vfo != Vfo::Current {
            self.vfo = vfo.canonical();
        }
        Ok(())
    }

    fn get_ptt(&mut self, _io: &mut RigIo, _vfo: Vfo) -> Result<Ptt, RigError> {
        Ok(self.ptt)
    }

    fn set_ptt(&mut self, _io: &mut RigIo, _vfo: Vfo, ptt: Ptt) -> Result<(), RigError> {
        self.ptt = ptt;
        Ok(())
    }

    fn get_split_vfo(&mut self, _io: &mut RigIo, _vfo: Vfo) -> Result<(Split, Vfo), RigError> {
        Ok((self.split, self.tx_vfo))
    }

    fn set_split_vfo(
        &mut self,
        _io: &mut RigIo,
        _vfo: Vfo,
        split: Split,
        tx_vfo: Vfo,
    ) -> Result<(), RigError> {
        self.slot(tx_vfo)?;
        self.split = split;
        self.tx_vfo = tx_vfo.canonical();
        Ok(())
    }

    fn get_level(&mut self, _io: &mut RigIo, _vfo: Vfo, level: Level) -> Result<Value, RigError> {
        Ok(self
            .levels
            .get(&level)
            .copied()
            .unwrap_or_else(|| default_level(level)))
    }

    fn set_level(
        &mut self,
        _io: &mut RigIo,
        _vfo: Vfo,
        level: Level,
        value: Value,
    ) -> Result<(), RigError> {
        if level == Level::Agc && Agc::from_int(value.as_i32()).is_none() {
            return Err(RigError::InvalidParam(format!("AGC setting {}", value)));
        }
        self.levels.insert(level, value);
        Ok(())
    }

    fn get_split_freq(&mut self, _io: &mut RigIo, vfo: Vfo) -> Result<Freq, RigError> {
        Ok(self.slot(vfo)?.tx_freq)
    }

    fn set_split_freq(&mut self, _io: &mut RigIo, vfo: Vfo, freq: Freq) -> Result<(), RigError> {
        self.slot(vfo)?.tx_freq = freq;
        Ok(())
    }

    fn get_split_mode(&mut self, _io: &mut RigIo, vfo: Vfo) -> Result<(Mode, Width), RigError> {
        let slot = self.slot(vfo)?;
        Ok((slot.tx_mode, slot.tx_width))
    }

    fn set_split_mode(
        &mut self,
        _io: &mut RigIo,
        vfo: Vfo,
        mode: Mode,
        width: Width,
    ) -> Result<(), RigError> {
        let slot = self.slot(vfo)?;
        slot.tx_mode = mode;
        slot.tx_width = width;
        Ok(())
    }

    fn get_func(&mut self, _io: &mut RigIo, _vfo: Vfo, func: Func) -> Result<bool, RigError> {
        Ok(self.funcs.contains(&func))
    }

    fn set_func(&mut self, _io: &mut RigIo, _vfo: Vfo, func: Func, on: bool) -> Result<(), RigError> {
        debug!("Dummy {} {}", func, if on { "on" } else { "off" });
        if on {
            self.funcs.insert(func);
        } else {
            self.funcs.remove(&func);
        }
        Ok(())
    }

    fn get_parm(&mut self, _io: &mut RigIo, parm: Parm) -> Result<Value, RigError> {
        Ok(self
            .parms
            .get(&parm)
            .copied()
            .unwrap_or_else(|| default_parm(parm)))
    }

    fn set_parm(&mut self, _io: &mut RigIo, parm: Parm, value: Value) -> Result<(), RigError> {
        self.parms.insert(parm, value);
        Ok(())
    }

    fn get_rit(&mut self, _io: &mut RigIo, vfo: Vfo) -> Result<Offset, RigError> {
        Ok(self.slot(vfo)?.rit)
    }

    fn set_rit(&mut self, _io: &mut RigIo, vfo: Vfo, offset: Offset) -> Result<(), RigError> {
        self.slot(vfo)?.rit = offset;
        Ok(())
    }

    fn get_xit(&mut self, _io: &mut RigIo, vfo: Vfo) -> Result<Offset, RigError> {
        Ok(self.slot(vfo)?.xit)
    }

    fn set_xit(&mut self, _io: &mut RigIo, vfo: Vfo, offset: Offset) -> Result<(), RigError> {
        self.slot(vfo)?.xit = offset;
        Ok(())
    }

    fn get_info(&mut self, _io: &mut RigIo) -> Result<String, RigError> {
        Ok("Nothing much (dummy)".into())
    }

    fn reset(&mut self, _io: &mut RigIo) -> Result<(), RigError> {
        info!("Dummy rig reset");
        *self = Self::new();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rig_core::{NullTransport, Rig};

    fn open() -> Rig {
        let mut rig = Rig::new(Box::new(Dummy::new()));
        rig.open(Box::new(NullTransport)).unwrap();
        rig
    }

    #[test]
    fn test_defaults() {
        let mut rig = open();
        assert_eq!(rig.get_vfo().unwrap(), Vfo::A);
        assert_eq!(rig.get_freq(Vfo::A).unwrap(), 145_000_000);
        assert_eq!(rig.get_freq(Vfo::B).unwrap(), 146_000_000);
        assert_eq!(rig.get_mode(Vfo::Current).unwrap(), (Mode::Fm, 15000));
        assert_eq!(rig.get_info().unwrap(), "Nothing much (dummy)");
    }

    #[test]
    fn test_vfos_are_independent() {
        let mut rig = open();
        rig.set_freq(Vfo::B, 7_074_000).unwrap();
        rig.set_mode(Vfo::B, Mode::Usb, 0).unwrap();
        rig.set_vfo(Vfo::B).unwrap();
        assert_eq!(rig.get_freq(Vfo::Current).unwrap(), 7_074_000);
        assert_eq!(rig.get_mode(Vfo::Current).unwrap(), (Mode::Usb, 2400));
        assert_eq!(rig.get_freq(Vfo::A).unwrap(), 145_000_000);
    }

    #[test]
    fn test_levels_and_read_only_meters() {
        let mut rig = open();
        rig.set_level(Vfo::Current, Level::Af, Value::Float(0.25))
            .unwrap();
        assert_eq!(
            rig.get_level(Vfo::Current, Level::Af).unwrap(),
            Value::Float(0.25)
        );
        assert!(matches!(
            rig.set_level(Vfo::Current, Level::Strength, Value::Int(0)),
            Err(RigError::NotAvailable(_))
        ));
        assert!(matches!(
            rig.set_level(Vfo::Current, Level::Att, Value::Int(15)),
            Err(RigError::OutOfRange(_))
        ));
        assert!(matches!(
            rig.set_level(Vfo::Current, Level::Agc, Value::Int(4)),
            Err(RigError::InvalidParam(_))
        ));
    }

    #[test]
    fn test_split_and_ptt() {
        let mut rig = open();
        rig.set_split_vfo(Vfo::A, Split::On, Vfo::B).unwrap();
        rig.set_ptt(Vfo::Current, Ptt::On).unwrap();
        rig.invalidate_cache(rig_core::CacheKind::Split, Vfo::A)
            .unwrap();
        assert_eq!(rig.get_split_vfo(Vfo::A).unwrap(), (Split::On, Vfo::B));
        assert_eq!(rig.get_ptt(Vfo::Current).unwrap(), Ptt::On);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut rig = open();
        rig.set_freq(Vfo::A, 14_074_000).unwrap();
        rig.set_func(Vfo::Current, Func::Nb, true).unwrap();
        rig.reset().unwrap();
        assert_eq!(rig.get_freq(Vfo::A).unwrap(), 145_000_000);
        assert!(!rig.get_func(Vfo::Current, Func::Nb).unwrap());
    }

    #[test]
    fn test_split_freq_and_mode_are_separate_from_rx() {
        let mut rig = open();
        rig.set_split_freq(Vfo::A, 14_080_000).unwrap();
        rig.set_split_mode(Vfo::A, Mode::Usb, 0).unwrap();
        assert_eq!(rig.get_split_freq(Vfo::A).unwrap(), 14_080_000);
        assert_eq!(rig.get_split_mode(Vfo::A).unwrap(), (Mode::Usb, 2400));
        assert_eq!(rig.get_freq(Vfo::A).unwrap(), 145_000_000);
        assert!(matches!(
            rig.set_split_freq(Vfo::A, 50_000),
            Err(RigError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_funcs_toggle() {
        let mut rig = open();
        assert!(!rig.get_func(Vfo::Current, Func::Lock).unwrap());
        rig.set_func(Vfo::Current, Func::Lock, true).unwrap();
        rig.set_func(Vfo::Current, Func::Nr, true).unwrap();
        rig.set_func(Vfo::Current, Func::Nr, false).unwrap();
        assert!(rig.get_func(Vfo::Current, Func::Lock).unwrap());
        assert!(!rig.get_func(Vfo::Current, Func::Nr).unwrap());
    }

    #[test]
    fn test_parms_check_type_and_step() {
        let mut rig = open();
        rig.set_parm(Parm::Apo, Value::Int(60)).unwrap();
        assert_eq!(rig.get_parm(Parm::Apo).unwrap(), Value::Int(60));
        assert!(matches!(
            rig.set_parm(Parm::Apo, Value::Int(45)),
            Err(RigError::OutOfRange(_))
        ));
        assert!(matches!(
            rig.set_parm(Parm::Backlight, Value::Int(1)),
            Err(RigError::InvalidParam(_))
        ));
        assert!(matches!(
            rig.set_parm(Parm::Bat, Value::Float(0.5)),
            Err(RigError::NotAvailable(_))
        ));
        assert_eq!(rig.get_parm(Parm::Bat).unwrap(), Value::Float(1.0));
    }

    #[test]
    fn test_rit_and_xit_limits() {
        let mut rig = open();
        rig.set_rit(Vfo::Current, -1200).unwrap();
        rig.set_xit(Vfo::Current, 500).unwrap();
        assert_eq!(rig.get_rit(Vfo::Current).unwrap(), -1200);
        assert_eq!(rig.get_xit(Vfo::Current).unwrap(), 500);
        assert!(matches!(
            rig.set_rit(Vfo::Current, 10_000),
            Err(RigError::OutOfRange(_))
        ));
        assert_eq!(rig.get_rit(Vfo::B).unwrap(), 0);
    }
}
