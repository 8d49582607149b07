//! Ten-Tec TT-588 Omni VII and TT-538 Jupiter
//!
//! Both radios speak the binary register protocol in
//! [`rig_protocol::tentec`]. Neither has a "select VFO" command: frequency
//! and mode address VFO A or B directly, so the current VFO is kept here.
//!
//! A DSP that stops answering is brought back with `XX`, which reboots it
//! and prints `RADIO START`. [`DspReset`] is installed as the engine's
//! recovery hook so any transaction that exhausts its retries gets one reset
//! cycle before failing.

use rig_core::engine::exchange_once;
use rig_core::{Command, RecoveryHook, RigBackend, RigIo, RigPort};
use rig_protocol::caps::{
    ChannelKind, ChannelRange, FilterSpec, FuncSet, Handshake, Op, ParmSet, Parity, PortCaps,
    PortType, RigCaps, RigStatus, RigType, Targetable, TuningStep,
};
use rig_protocol::tentec::{self, TenTecCommand, TenTecMeter, RESET_BANNER};
use rig_protocol::{
    Agc, EncodeCommand, FilterTable, Freq, Level, Mode, Ptt, RigError, Split, Value, Vfo, Width,
};
use tracing::{debug, info, warn};

use crate::ranges::{rx_range, tx_range};

const EOM: &[u8] = b"\r";

/// `XX` attempts per recovery
const RESET_ATTEMPTS: usize = 3;

/// Longest banner or version string we read
const TEXT_MAX_LEN: usize = 32;

const VFOS: &[Vfo] = &[Vfo::A, Vfo::B];

const OPS: &[Op] = &[
    Op::GetFreq,
    Op::SetFreq,
    Op::GetMode,
    Op::SetMode,
    Op::GetVfo,
    Op::SetVfo,
    Op::SetPtt,
    Op::GetSplitVfo,
    Op::SetSplitVfo,
    Op::GetLevel,
    Op::SetLevel,
    Op::GetInfo,
    Op::Reset,
];

const PORT: PortCaps = PortCaps {
    port_type: PortType::Serial,
    serial_rate_min: 57600,
    serial_rate_max: 57600,
    data_bits: 8,
    stop_bits: 1,
    parity: Parity::None,
    handshake: Handshake::Hardware,
    write_delay_ms: 0,
    post_write_delay_ms: 0,
    timeout_ms: 400,
    retry: 3,
};

const STEPS_588: &[TuningStep] = &[
    TuningStep { modes: TT588_MODES, step: 1 },
    TuningStep { modes: TT588_MODES, step: 10 },
    TuningStep { modes: TT588_MODES, step: 100 },
    TuningStep { modes: TT588_MODES, step: 1_000 },
    TuningStep { modes: TT588_MODES, step: 10_000 },
    TuningStep { modes: TT588_MODES, step: 100_000 },
];

const STEPS_538: &[TuningStep] = &[
    TuningStep { modes: TT538_MODES, step: 1 },
    TuningStep { modes: TT538_MODES, step: 10 },
    TuningStep { modes: TT538_MODES, step: 100 },
    TuningStep { modes: TT538_MODES, step: 1_000 },
    TuningStep { modes: TT538_MODES, step: 10_000 },
    TuningStep { modes: TT538_MODES, step: 100_000 },
];

const MEMORIES: &[ChannelRange] = &[ChannelRange {
    start: 0,
    end: 127,
    kind: ChannelKind::Memory,
}];

const TT588_MODES: &[Mode] = &[Mode::Am, Mode::Cw, Mode::CwR, Mode::Usb, Mode::Lsb, Mode::Fm];
const TT588_NARROW: &[Mode] = &[Mode::Am, Mode::Cw, Mode::CwR, Mode::Usb, Mode::Lsb];

/// TT-588 Omni VII
pub const TT588_CAPS: RigCaps = RigCaps {
    model: 1611,
    model_name: "TT-588 Omni VII",
    manufacturer: "Ten-Tec",
    version: "20220718.0",
    status: RigStatus::Stable,
    rig_type: RigType::Transceiver,
    port: PORT,
    ops: OPS,
    targetable: Targetable {
        freq: true,
        mode: true,
    },
    modes: TT588_MODES,
    vfos: VFOS,
    get_levels: &[
        Level::Strength,
        Level::Sql,
        Level::Swr,
        Level::Rf,
        Level::Af,
        Level::Agc,
        Level::Preamp,
        Level::Att,
        Level::RfPower,
    ],
    set_levels: &[Level::Af, Level::Rf, Level::Agc],
    level_gran: &[],
    preamp: &[10],
    attenuator: &[6, 12, 18],
    get_funcs: FuncSet::EMPTY,
    set_funcs: FuncSet::EMPTY,
    get_parms: ParmSet::EMPTY,
    set_parms: ParmSet::EMPTY,
    parm_gran: &[],
    max_rit: 0,
    max_xit: 0,
    rx_ranges: &[
        rx_range(500_000, 30_000_000, TT588_MODES, VFOS, 0b11),
        rx_range(48_000_000, 54_000_000, TT588_MODES, VFOS, 0b11),
    ],
    tx_ranges: &[
        tx_range(1_800_000, 2_000_000, TT588_MODES, 5_000, 100_000, VFOS, 0b11),
        tx_range(3_500_000, 4_000_000, TT588_MODES, 5_000, 100_000, VFOS, 0b11),
        tx_range(5_250_000, 5_400_000, TT588_MODES, 5_000, 100_000, VFOS, 0b11),
        tx_range(7_000_000, 7_300_000, TT588_MODES, 5_000, 100_000, VFOS, 0b11),
        tx_range(10_100_000, 10_150_000, TT588_MODES, 5_000, 100_000, VFOS, 0b11),
        tx_range(14_000_000, 14_350_000, TT588_MODES, 5_000, 100_000, VFOS, 0b11),
        tx_range(18_068_000, 18_168_000, TT588_MODES, 5_000, 100_000, VFOS, 0b11),
        tx_range(21_000_000, 21_450_000, TT588_MODES, 5_000, 100_000, VFOS, 0b11),
        tx_range(24_890_000, 24_990_000, TT588_MODES, 5_000, 100_000, VFOS, 0b11),
        tx_range(28_000_000, 29_700_000, TT588_MODES, 5_000, 100_000, VFOS, 0b11),
        tx_range(50_000_000, 54_000_000, TT588_MODES, 5_000, 100_000, VFOS, 0b11),
    ],
    tuning_steps: STEPS_588,
    filters: &[
        FilterSpec { modes: TT588_NARROW, width: 2400 },
        FilterSpec { modes: TT588_NARROW, width: 300 },
        FilterSpec { modes: TT588_NARROW, width: 8000 },
        FilterSpec { modes: TT588_NARROW, width: 0 },
        FilterSpec { modes: &[Mode::Fm], width: 15000 },
    ],
    channels: MEMORIES,
};

const TT538_MODES: &[Mode] = &[Mode::Am, Mode::Cw, Mode::Usb, Mode::Lsb, Mode::Fm];
const TT538_NARROW: &[Mode] = &[Mode::Am, Mode::Cw, Mode::Usb, Mode::Lsb];

/// TT-538 Jupiter
pub const TT538_CAPS: RigCaps = RigCaps {
    model: 1602,
    model_name: "TT-538 Jupiter",
    manufacturer: "Ten-Tec",
    version: "20221205.0",
    status: RigStatus::Stable,
    rig_type: RigType::Transceiver,
    port: PORT,
    ops: OPS,
    targetable: Targetable {
        freq: true,
        mode: true,
    },
    modes: TT538_MODES,
    vfos: VFOS,
    get_levels: &[
        Level::RawStr,
        Level::Sql,
        Level::Rf,
        Level::Af,
        Level::Agc,
        Level::Swr,
        Level::Att,
    ],
    set_levels: &[Level::Sql, Level::Rf, Level::Af, Level::Agc, Level::Att],
    level_gran: &[],
    preamp: &[],
    attenuator: &[15],
    get_funcs: FuncSet::EMPTY,
    set_funcs: FuncSet::EMPTY,
    get_parms: ParmSet::EMPTY,
    set_parms: ParmSet::EMPTY,
    parm_gran: &[],
    max_rit: 0,
    max_xit: 0,
    rx_ranges: &[rx_range(100_000, 30_000_000, TT538_MODES, VFOS, 0b1)],
    tx_ranges: &[
        tx_range(1_800_000, 2_000_000, TT538_MODES, 5_000, 100_000, VFOS, 0b1),
        tx_range(3_500_000, 4_000_000, TT538_MODES, 5_000, 100_000, VFOS, 0b1),
        tx_range(5_250_000, 5_400_000, TT538_MODES, 5_000, 100_000, VFOS, 0b1),
        tx_range(7_000_000, 7_300_000, TT538_MODES, 5_000, 100_000, VFOS, 0b1),
        tx_range(10_100_000, 10_150_000, TT538_MODES, 5_000, 100_000, VFOS, 0b1),
        tx_range(14_000_000, 14_350_000, TT538_MODES, 5_000, 100_000, VFOS, 0b1),
        tx_range(18_068_000, 18_168_000, TT538_MODES, 5_000, 100_000, VFOS, 0b1),
        tx_range(21_000_000, 21_450_000, TT538_MODES, 5_000, 100_000, VFOS, 0b1),
        tx_range(24_890_000, 24_990_000, TT538_MODES, 5_000, 100_000, VFOS, 0b1),
        tx_range(28_000_000, 29_700_000, TT538_MODES, 5_000, 100_000, VFOS, 0b1),
    ],
    tuning_steps: STEPS_538,
    filters: &[
        FilterSpec { modes: TT538_NARROW, width: 2400 },
        FilterSpec { modes: TT538_NARROW, width: 300 },
        FilterSpec { modes: TT538_NARROW, width: 8000 },
        FilterSpec { modes: TT538_NARROW, width: 0 },
        FilterSpec { modes: &[Mode::Fm], width: 15000 },
    ],
    channels: MEMORIES,
};

/// Reboots the DSP until it prints its start banner
#[derive(Debug, Clone)]
pub struct DspReset {
    attempts: usize,
}

impl DspReset {
    pub fn new(attempts: usize) -> Self {
        Self { attempts }
    }
}

impl Default for DspReset {
    fn default() -> Self {
        Self::new(RESET_ATTEMPTS)
    }
}

fn has_banner(reply: &[u8]) -> bool {
    reply
        .windows(RESET_BANNER.len())
        .any(|w| w == RESET_BANNER.as_bytes())
}

impl RecoveryHook for DspReset {
    fn recover(&mut self, port: &mut RigPort) -> Result<(), RigError> {
        let command = Command::terminated(TenTecCommand::Reset.encode()?, EOM, TEXT_MAX_LEN);
        let mut last = RigError::Timeout;
        for attempt in 1..=self.attempts {
            match exchange_once(port, &command) {
                Ok(reply) if has_banner(&reply) => {
                    info!("DSP restarted after {} reset attempt(s)", attempt);
                    return Ok(());
                }
                Ok(reply) => {
                    last = RigError::Protocol(format!("no reset banner in {:02X?}", reply));
                }
                Err(e) => last = e,
            }
            warn!(
                "Failed to reset DSP ({}/{}): {}",
                attempt, self.attempts, last
            );
        }
        Err(last)
    }
}

/// Backend shared by the Ten-Tec models
#[derive(Debug)]
pub struct TenTec {
    caps: &'static RigCaps,
    filters: FilterTable,
    vfo: Vfo,
}

impl TenTec {
    pub fn tt588() -> Self {
        Self {
            caps: &TT588_CAPS,
            filters: FilterTable {
                widths: tentec::TT588_FILTERS,
            },
            vfo: Vfo::A,
        }
    }

    pub fn tt538() -> Self {
        Self {
            caps: &TT538_CAPS,
            filters: FilterTable {
                widths: tentec::TT538_FILTERS,
            },
            vfo: Vfo::A,
        }
    }

    /// Attenuation in dB for a raw `J` register value
    fn att_db(&self, raw: u8) -> i32 {
        match raw {
            0 => 0,
            n => self
                .caps
                .attenuator
                .get(usize::from(n) - 1)
                .or(self.caps.attenuator.last())
                .copied()
                .unwrap_or(0),
        }
    }

    /// Raw `J` register value for an attenuation in dB
    fn att_raw(&self, db: i32) -> Result<u8, RigError> {
        if db == 0 {
            return Ok(0);
        }
        self.caps
            .attenuator
            .iter()
            .position(|a| *a == db)
            .and_then(|i| u8::try_from(i + 1).ok())
            .ok_or_else(|| RigError::OutOfRange(format!("attenuator {} dB", db)))
    }
}

fn vfo_letter(vfo: Vfo) -> Result<u8, RigError> {
    match vfo {
        Vfo::A => Ok(b'A'),
        Vfo::B => Ok(b'B'),
        other => Err(RigError::InvalidParam(format!("{} on Ten-Tec", other))),
    }
}

/// Query with a fixed-length reply starting with `tag`
fn query(io: &mut RigIo, command: TenTecCommand, tag: u8) -> Result<Vec<u8>, RigError> {
    let len = command
        .fixed_reply_len()
        .ok_or_else(|| RigError::Internal(format!("{:?} has no fixed reply", command)))?;
    io.transact(&Command::fixed(command.encode()?, len).tag(&[tag]))
}

fn send(io: &mut RigIo, command: TenTecCommand) -> Result<(), RigError> {
    io.transact(&Command::write_only(command.encode()?))?;
    Ok(())
}

fn read_meter(io: &mut RigIo, meter: TenTecMeter) -> Result<u8, RigError> {
    let reply = query(io, TenTecCommand::GetMeter(meter), meter.letter())?;
    Ok(tentec::decode_meter(&reply, meter)?)
}

fn read_signal(io: &mut RigIo) -> Result<i32, RigError> {
    let reply = query(io, TenTecCommand::GetMeter(TenTecMeter::Signal), b'S')?;
    Ok(tentec::decode_signal(&reply)?)
}

/// SWR from forward and reflected meter readings
pub fn swr_from_meters(forward: u8, reflected: u8) -> f32 {
    if forward == 0 {
        return 1.0;
    }
    let rho = (f32::from(reflected) / f32::from(forward)).sqrt().min(0.99);
    (1.0 + rho) / (1.0 - rho)
}

fn to_register(value: Value) -> u8 {
    (value.as_f32().clamp(0.0, 1.0) * 127.0).round() as u8
}

fn from_register(raw: u8) -> f32 {
    (f32::from(raw) / 127.0).min(1.0)
}

impl RigBackend for TenTec {
    fn caps(&self) -> &'static RigCaps {
        self.caps
    }

    fn open(&mut self, _io: &mut RigIo) -> Result<(), RigError> {
        self.vfo = Vfo::A;
        Ok(())
    }

    fn recovery_hook(&self) -> Option<Box<dyn RecoveryHook>> {
        Some(Box::new(DspReset::default()))
    }

    fn get_freq(&mut self, io: &mut RigIo, vfo: Vfo) -> Result<Freq, RigError> {
        let letter = vfo_letter(vfo)?;
        let reply = query(io, TenTecCommand::GetFrequency { vfo: letter }, letter)?;
        Ok(tentec::decode_frequency(&reply, letter)?)
    }

    fn set_freq(&mut self, io: &mut RigIo, vfo: Vfo, freq: Freq) -> Result<(), RigError> {
        let hz = u32::try_from(freq).map_err(|_| RigError::OutOfRange(format!("{} Hz", freq)))?;
        send(
            io,
            TenTecCommand::SetFrequency {
                vfo: vfo_letter(vfo)?,
                hz,
            },
        )
    }

    fn get_mode(&mut self, io: &mut RigIo, vfo: Vfo) -> Result<(Mode, Width), RigError> {
        vfo_letter(vfo)?;
        let reply = query(io, TenTecCommand::GetMode, b'M')?;
        let (a, b) = tentec::decode_mode(&reply)?;
        let mode = tentec::char_to_mode(if vfo == Vfo::B { b } else { a })?;

        let reply = query(io, TenTecCommand::GetFilter, b'W')?;
        let index = tentec::decode_filter(&reply)?;
        let width = self
            .filters
            .width_for_index(usize::from(index))
            .ok_or_else(|| RigError::Protocol(format!("filter index {} out of range", index)))?;
        Ok((mode, width))
    }

    fn set_mode(
        &mut self,
        io: &mut RigIo,
        vfo: Vfo,
        mode: Mode,
        width: Width,
    ) -> Result<(), RigError> {
        vfo_letter(vfo)?;
        let c = tentec::mode_to_char(mode)?;
        // the mode register holds both VFOs; keep the other one as it is
        let reply = query(io, TenTecCommand::GetMode, b'M')?;
        let (a, b) = tentec::decode_mode(&reply)?;
        let (mode_a, mode_b) = if vfo == Vfo::B { (a, c) } else { (c, b) };
        send(io, TenTecCommand::SetMode { mode_a, mode_b })?;

        let index = self.filters.index_for_width(width);
        debug!("Filter {} Hz -> index {}", width, index);
        let index = u8::try_from(index)
            .map_err(|_| RigError::Internal(format!("filter index {}", index)))?;
        send(io, TenTecCommand::SetFilter { index })
    }

    fn get_vfo(&mut self, _io: &mut RigIo) -> Result<Vfo, RigError> {
        Ok(self.vfo)
    }

    fn set_vfo(&mut self, _io: &mut RigIo, vfo: Vfo) -> Result<(), RigError> {
        vfo_letter(vfo)?;
        self.vfo = vfo;
        Ok(())
    }

    fn set_ptt(&mut self, io: &mut RigIo, _vfo: Vfo, ptt: Ptt) -> Result<(), RigError> {
        send(io, TenTecCommand::SetPtt(ptt.is_on()))
    }

    fn get_split_vfo(&mut self, io: &mut RigIo, _vfo: Vfo) -> Result<(Split, Vfo), RigError> {
        let reply = query(io, TenTecCommand::GetSplit, b'O')?;
        let on = tentec::decode_split(&reply)?;
        Ok((Split::from(on), if on { Vfo::B } else { Vfo::A }))
    }

    fn set_split_vfo(
        &mut self,
        io: &mut RigIo,
        _vfo: Vfo,
        split: Split,
        _tx_vfo: Vfo,
    ) -> Result<(), RigError> {
        send(io, TenTecCommand::SetSplit(split.is_on()))
    }

    fn get_level(&mut self, io: &mut RigIo, _vfo: Vfo, level: Level) -> Result<Value, RigError> {
        let value = match level {
            Level::Af => Value::Float(from_register(read_meter(io, TenTecMeter::Volume)?)),
            // 0 is full gain
            Level::Rf => Value::Float(1.0 - from_register(read_meter(io, TenTecMeter::RfGain)?)),
            Level::Sql => Value::Float(from_register(read_meter(io, TenTecMeter::Squelch)?)),
            Level::Agc => {
                let raw = read_meter(io, TenTecMeter::Agc)?;
                Value::Int(tentec::char_to_agc(raw)? as i32)
            }
            Level::Att => Value::Int(self.att_db(read_meter(io, TenTecMeter::Attenuator)?)),
            Level::Preamp => Value::Int(0),
            Level::RfPower => {
                Value::Float(f32::from(read_meter(io, TenTecMeter::Power)?) / 255.0)
            }
            Level::Strength => Value::Int(read_signal(io)?),
            Level::RawStr => Value::Int(read_signal(io)? + 54),
            Level::Swr => {
                let forward = read_meter(io, TenTecMeter::Forward)?;
                let reflected = read_meter(io, TenTecMeter::Reflected)?;
                Value::Float(swr_from_meters(forward, reflected))
            }
            other => return Err(RigError::NotAvailable(format!("get_level {}", other))),
        };
        Ok(value)
    }

    fn set_level(
        &mut self,
        io: &mut RigIo,
        _vfo: Vfo,
        level: Level,
        value: Value,
    ) -> Result<(), RigError> {
        let command = match level {
            Level::Af => TenTecCommand::SetMeter(TenTecMeter::Volume, to_register(value)),
            Level::Rf => TenTecCommand::SetMeter(TenTecMeter::RfGain, 127 - to_register(value)),
            Level::Sql => TenTecCommand::SetMeter(TenTecMeter::Squelch, to_register(value)),
            Level::Agc => {
                let agc = Agc::from_int(value.as_i32())
                    .ok_or_else(|| RigError::InvalidParam(format!("AGC {}", value)))?;
                TenTecCommand::SetMeter(TenTecMeter::Agc, tentec::agc_to_char(agc)?)
            }
            Level::Att => {
                TenTecCommand::SetMeter(TenTecMeter::Attenuator, self.att_raw(value.as_i32())?)
            }
            other => return Err(RigError::NotAvailable(format!("set_level {}", other))),
        };
        send(io, command)
    }

    fn get_info(&mut self, io: &mut RigIo) -> Result<String, RigError> {
        let frame = TenTecCommand::GetVersion.encode()?;
        let reply = io.transact(
            &Command::terminated(frame, EOM, TEXT_MAX_LEN)
                .tag(b"VER")
                .require_terminator(),
        )?;
        Ok(String::from_utf8_lossy(&reply).trim_end().to_string())
    }

    fn reset(&mut self, io: &mut RigIo) -> Result<(), RigError> {
        let frame = TenTecCommand::Reset.encode()?;
        let reply = io.transact(&Command::terminated(frame, EOM, TEXT_MAX_LEN))?;
        if has_banner(&reply) {
            self.vfo = Vfo::A;
            Ok(())
        } else {
            Err(RigError::Protocol(format!(
                "expected '{}', got {:02X?}",
                RESET_BANNER, reply
            )))
        }
    }
}
