//! Kenwood TS-480
//!
//! ASCII commands terminated by `;`. Set commands are not acknowledged; a
//! query answers with the same prefix and its parameters, or `?;` if the
//! radio refused it. Only frequency is VFO-addressable (`FA`/`FB`); mode and
//! levels follow the receive VFO selected with `FR`.
//!
//! RIT and XIT share one offset register, so `get_xit` and `get_rit` read
//! the same value from `IF`.

use rig_core::{Command, LengthCheck, RigBackend, RigIo};
use rig_protocol::caps::{
    FilterSpec, FuncSet, Handshake, Op, ParmSet, Parity, PortCaps, PortType, RigCaps,
    RigStatus, RigType, Targetable, TuningStep,
};
use rig_protocol::kenwood::{self, KenwoodCommand, KenwoodSwitch, IF_REPLY_LEN, REJECTED};
use rig_protocol::{
    EncodeCommand, Freq, Func, Level, Mode, Offset, ParseError, Ptt, RigError, Split, Value,
    Vfo, Width,
};
use tracing::debug;

use crate::ranges::{rx_range, tx_range};

const TERMINATOR: &[u8] = b";";

/// Longest reply we read
const REPLY_MAX_LEN: usize = 64;

const VFOS: &[Vfo] = &[Vfo::A, Vfo::B];

const ALL_MODES: &[Mode] = &[
    Mode::Am,
    Mode::Cw,
    Mode::CwR,
    Mode::Usb,
    Mode::Lsb,
    Mode::Fm,
    Mode::Rtty,
    Mode::RttyR,
];
const OTHER_TX_MODES: &[Mode] = &[
    Mode::Cw,
    Mode::CwR,
    Mode::Usb,
    Mode::Lsb,
    Mode::Fm,
    Mode::Rtty,
    Mode::RttyR,
];
const AM_TX_MODES: &[Mode] = &[Mode::Am];

const FUNCS: FuncSet = FuncSet::of(&[
    Func::Nb,
    Func::Comp,
    Func::Vox,
    Func::Nr,
    Func::Lock,
    Func::Rit,
    Func::Xit,
]);

/// Power in watts at full scale
const MAX_POWER_W: f32 = 100.0;
const MIN_POWER_W: f32 = 5.0;

/// TS-480
pub const TS480_CAPS: RigCaps = RigCaps {
    model: 228,
    model_name: "TS-480",
    manufacturer: "Kenwood",
    version: "20230109.1",
    status: RigStatus::Stable,
    rig_type: RigType::Transceiver,
    port: PortCaps {
        port_type: PortType::Serial,
        serial_rate_min: 4800,
        serial_rate_max: 115200,
        data_bits: 8,
        stop_bits: 1,
        parity: Parity::None,
        handshake: Handshake::None,
        write_delay_ms: 0,
        post_write_delay_ms: 0,
        timeout_ms: 200,
        retry: 3,
    },
    ops: &[
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
        Op::GetLevel,
        Op::SetLevel,
        Op::GetFunc,
        Op::SetFunc,
        Op::GetRit,
        Op::SetRit,
        Op::GetXit,
        Op::SetXit,
        Op::GetInfo,
        Op::Reset,
    ],
    targetable: Targetable {
        freq: true,
        mode: false,
    },
    modes: ALL_MODES,
    vfos: VFOS,
    get_levels: &[Level::Af, Level::Rf, Level::Sql, Level::RfPower],
    set_levels: &[Level::Af, Level::Rf, Level::Sql, Level::RfPower],
    level_gran: &[],
    preamp: &[12],
    attenuator: &[12],
    get_funcs: FUNCS,
    set_funcs: FUNCS,
    get_parms: ParmSet::EMPTY,
    set_parms: ParmSet::EMPTY,
    parm_gran: &[],
    max_rit: 9999,
    max_xit: 9999,
    rx_ranges: &[rx_range(100_000, 59_999_999, ALL_MODES, VFOS, 0b1)],
    tx_ranges: &[
        tx_range(1_800_000, 1_999_999, OTHER_TX_MODES, 5_000, 100_000, VFOS, 0b1),
        tx_range(1_800_000, 1_999_999, AM_TX_MODES, 5_000, 25_000, VFOS, 0b1),
        tx_range(3_500_000, 3_999_999, OTHER_TX_MODES, 5_000, 100_000, VFOS, 0b1),
        tx_range(3_500_000, 3_999_999, AM_TX_MODES, 5_000, 25_000, VFOS, 0b1),
        tx_range(5_250_000, 5_450_000, OTHER_TX_MODES, 5_000, 100_000, VFOS, 0b1),
        tx_range(5_250_000, 5_450_000, AM_TX_MODES, 5_000, 25_000, VFOS, 0b1),
        tx_range(7_000_000, 7_300_000, OTHER_TX_MODES, 5_000, 100_000, VFOS, 0b1),
        tx_range(7_000_000, 7_300_000, AM_TX_MODES, 5_000, 25_000, VFOS, 0b1),
        tx_range(10_100_000, 10_150_000, OTHER_TX_MODES, 5_000, 100_000, VFOS, 0b1),
        tx_range(10_100_000, 10_150_000, AM_TX_MODES, 5_000, 25_000, VFOS, 0b1),
        tx_range(14_000_000, 14_350_000, OTHER_TX_MODES, 5_000, 100_000, VFOS, 0b1),
        tx_range(14_000_000, 14_350_000, AM_TX_MODES, 5_000, 25_000, VFOS, 0b1),
        tx_range(18_068_000, 18_168_000, OTHER_TX_MODES, 5_000, 100_000, VFOS, 0b1),
        tx_range(18_068_000, 18_168_000, AM_TX_MODES, 5_000, 25_000, VFOS, 0b1),
        tx_range(21_000_000, 21_450_000, OTHER_TX_MODES, 5_000, 100_000, VFOS, 0b1),
        tx_range(21_000_000, 21_450_000, AM_TX_MODES, 5_000, 25_000, VFOS, 0b1),
        tx_range(24_890_000, 24_990_000, OTHER_TX_MODES, 5_000, 100_000, VFOS, 0b1),
        tx_range(24_890_000, 24_990_000, AM_TX_MODES, 5_000, 25_000, VFOS, 0b1),
        tx_range(28_000_000, 29_700_000, OTHER_TX_MODES, 5_000, 100_000, VFOS, 0b1),
        tx_range(28_000_000, 29_700_000, AM_TX_MODES, 5_000, 25_000, VFOS, 0b1),
        tx_range(50_000_000, 52_000_000, OTHER_TX_MODES, 5_000, 100_000, VFOS, 0b1),
        tx_range(50_000_000, 52_000_000, AM_TX_MODES, 5_000, 25_000, VFOS, 0b1),
    ],
    tuning_steps: &[
        TuningStep { modes: ALL_MODES, step: 1_000 },
        TuningStep { modes: ALL_MODES, step: 2_500 },
        TuningStep { modes: ALL_MODES, step: 5_000 },
        TuningStep { modes: ALL_MODES, step: 6_250 },
        TuningStep { modes: ALL_MODES, step: 10_000 },
        TuningStep { modes: ALL_MODES, step: 12_500 },
        TuningStep { modes: ALL_MODES, step: 15_000 },
        TuningStep { modes: ALL_MODES, step: 20_000 },
    ],
    filters: &[
        FilterSpec { modes: &[Mode::Usb, Mode::Lsb], width: 2400 },
        FilterSpec { modes: &[Mode::Cw, Mode::CwR, Mode::Rtty, Mode::RttyR], width: 500 },
        FilterSpec { modes: &[Mode::Am], width: 6000 },
        FilterSpec { modes: &[Mode::Fm], width: 12000 },
    ],
    channels: &[],
};

/// TS-480 backend
#[derive(Debug, Default)]
pub struct Ts480;

impl Ts480 {
    pub fn new() -> Self {
        Self
    }
}

fn vfo_digit(vfo: Vfo) -> Result<u8, RigError> {
    match vfo {
        Vfo::A => Ok(0),
        Vfo::B => Ok(1),
        other => Err(RigError::InvalidParam(format!("{} on Kenwood", other))),
    }
}

fn digit_vfo(digit: u8) -> Result<Vfo, RigError> {
    match digit {
        0 => Ok(Vfo::A),
        1 => Ok(Vfo::B),
        other => Err(RigError::Protocol(format!("VFO digit {}", other))),
    }
}

fn unexpected(reply: &KenwoodCommand) -> RigError {
    RigError::Protocol(format!("unexpected reply {:?}", reply))
}

fn well_formed(reply: &[u8]) -> Result<(), ParseError> {
    kenwood::decode_reply(reply).map(|_| ())
}

/// A query whose reply must be a complete frame with the same prefix
fn query_command(frame: Vec<u8>, tag: &[u8]) -> Command {
    Command::terminated(frame, TERMINATOR, REPLY_MAX_LEN)
        .tag(tag)
        .rejection(REJECTED)
        .require_terminator()
        .check(well_formed)
}

/// Send a query and parse the reply
fn query(io: &mut RigIo, command: KenwoodCommand) -> Result<KenwoodCommand, RigError> {
    let frame = command.encode()?;
    let tag = frame[..2].to_vec();
    let reply = io.transact(&query_command(frame, &tag))?;
    Ok(kenwood::decode_reply(&reply)?)
}

fn send(io: &mut RigIo, command: KenwoodCommand) -> Result<(), RigError> {
    io.transact(&Command::write_only(command.encode()?))?;
    Ok(())
}

fn read_info(io: &mut RigIo) -> Result<kenwood::KenwoodInfo, RigError> {
    let frame = KenwoodCommand::Info(None).encode()?;
    let reply =
        io.transact(&query_command(frame, b"IF").length(LengthCheck::Exact(IF_REPLY_LEN)))?;
    match kenwood::decode_reply(&reply)? {
        KenwoodCommand::Info(Some(info)) => Ok(info),
        other => Err(unexpected(&other)),
    }
}

fn switch_for(func: Func) -> Result<KenwoodSwitch, RigError> {
    match func {
        Func::Nb => Ok(KenwoodSwitch::NoiseBlanker),
        Func::Comp => Ok(KenwoodSwitch::Processor),
        Func::Vox => Ok(KenwoodSwitch::Vox),
        Func::Nr => Ok(KenwoodSwitch::NoiseReduction),
        Func::Lock => Ok(KenwoodSwitch::Lock),
        Func::Rit => Ok(KenwoodSwitch::Rit),
        Func::Xit => Ok(KenwoodSwitch::Xit),
        other => Err(RigError::NotAvailable(format!("func {}", other))),
    }
}

/// Clear the shared offset, then step it to `offset`
fn set_offset(io: &mut RigIo, offset: Offset) -> Result<(), RigError> {
    send(io, KenwoodCommand::RitClear)?;
    let hz = offset.unsigned_abs();
    match offset {
        0 => Ok(()),
        o if o > 0 => send(io, KenwoodCommand::RitUp(Some(hz))),
        _ => send(io, KenwoodCommand::RitDown(Some(hz))),
    }
}

/// 0..=255 register to 0.0..=1.0
fn from_gain(raw: u16) -> f32 {
    (f32::from(raw) / 255.0).min(1.0)
}

fn to_gain(value: Value) -> u16 {
    (value.as_f32().clamp(0.0, 1.0) * 255.0).round() as u16
}

impl RigBackend for Ts480 {
    fn caps(&self) -> &'static RigCaps {
        &TS480_CAPS
    }

    fn get_freq(&mut self, io: &mut RigIo, vfo: Vfo) -> Result<Freq, RigError> {
        let command = match vfo {
            Vfo::B => KenwoodCommand::FrequencyB(None),
            _ => KenwoodCommand::FrequencyA(None),
        };
        match query(io, command)? {
            KenwoodCommand::FrequencyA(Some(hz)) if vfo != Vfo::B => Ok(hz),
            KenwoodCommand::FrequencyB(Some(hz)) if vfo == Vfo::B => Ok(hz),
            other => Err(unexpected(&other)),
        }
    }

    fn set_freq(&mut self, io: &mut RigIo, vfo: Vfo, freq: Freq) -> Result<(), RigError> {
        let command = match vfo {
            Vfo::B => KenwoodCommand::FrequencyB(Some(freq)),
            _ => KenwoodCommand::FrequencyA(Some(freq)),
        };
        send(io, command)
    }

    fn get_mode(&mut self, io: &mut RigIo, _vfo: Vfo) -> Result<(Mode, Width), RigError> {
        match query(io, KenwoodCommand::Mode(None))? {
            KenwoodCommand::Mode(Some(digit)) => {
                let mode = kenwood::mode_from_digit(digit)?;
                Ok((mode, TS480_CAPS.passband_normal(mode).unwrap_or(0)))
            }
            other => Err(unexpected(&other)),
        }
    }

    fn set_mode(
        &mut self,
        io: &mut RigIo,
        _vfo: Vfo,
        mode: Mode,
        width: Width,
    ) -> Result<(), RigError> {
        if TS480_CAPS.passband_normal(mode) != Some(width) {
            debug!("TS-480 keeps its own filter; ignoring {} Hz", width);
        }
        send(
            io,
            KenwoodCommand::Mode(Some(kenwood::mode_to_digit(mode)?)),
        )
    }

    fn get_vfo(&mut self, io: &mut RigIo) -> Result<Vfo, RigError> {
        match query(io, KenwoodCommand::RxVfo(None))? {
            KenwoodCommand::RxVfo(Some(digit)) => digit_vfo(digit),
            other => Err(unexpected(&other)),
        }
    }

    fn set_vfo(&mut self, io: &mut RigIo, vfo: Vfo) -> Result<(), RigError> {
        send(io, KenwoodCommand::RxVfo(Some(vfo_digit(vfo)?)))
    }

    fn get_ptt(&mut self, io: &mut RigIo, _vfo: Vfo) -> Result<Ptt, RigError> {
        Ok(Ptt::from(read_info(io)?.tx))
    }

    fn set_ptt(&mut self, io: &mut RigIo, _vfo: Vfo, ptt: Ptt) -> Result<(), RigError> {
        send(
            io,
            if ptt.is_on() {
                KenwoodCommand::Transmit
            } else {
                KenwoodCommand::Receive
            },
        )
    }

    fn get_split_vfo(&mut self, io: &mut RigIo, _vfo: Vfo) -> Result<(Split, Vfo), RigError> {
        let info = read_info(io)?;
        let rx = digit_vfo(info.vfo)?;
        let tx = if info.split {
            rx.other().unwrap_or(Vfo::B)
        } else {
            rx
        };
        Ok((Split::from(info.split), tx))
    }

    fn set_split_vfo(
        &mut self,
        io: &mut RigIo,
        vfo: Vfo,
        split: Split,
        tx_vfo: Vfo,
    ) -> Result<(), RigError> {
        let rx = vfo_digit(vfo)?;
        let tx = if split.is_on() {
            vfo_digit(tx_vfo.canonical())?
        } else {
            rx
        };
        send(io, KenwoodCommand::RxVfo(Some(rx)))?;
        send(io, KenwoodCommand::TxVfo(Some(tx)))
    }

    fn get_level(&mut self, io: &mut RigIo, _vfo: Vfo, level: Level) -> Result<Value, RigError> {
        let command = match level {
            Level::Af => KenwoodCommand::AfGain(None),
            Level::Rf => KenwoodCommand::RfGain(None),
            Level::Sql => KenwoodCommand::Squelch(None),
            Level::RfPower => KenwoodCommand::Power(None),
            other => return Err(RigError::NotAvailable(format!("get_level {}", other))),
        };
        let value = match query(io, command)? {
            KenwoodCommand::AfGain(Some(v))
            | KenwoodCommand::RfGain(Some(v))
            | KenwoodCommand::Squelch(Some(v)) => from_gain(v),
            KenwoodCommand::Power(Some(watts)) => (f32::from(watts) / MAX_POWER_W).min(1.0),
            other => return Err(unexpected(&other)),
        };
        Ok(Value::Float(value))
    }

    fn set_level(
        &mut self,
        io: &mut RigIo,
        _vfo: Vfo,
        level: Level,
        value: Value,
    ) -> Result<(), RigError> {
        let command = match level {
            Level::Af => KenwoodCommand::AfGain(Some(to_gain(value))),
            Level::Rf => KenwoodCommand::RfGain(Some(to_gain(value))),
            Level::Sql => KenwoodCommand::Squelch(Some(to_gain(value))),
            Level::RfPower => {
                let watts = (value.as_f32() * MAX_POWER_W)
                    .round()
                    .clamp(MIN_POWER_W, MAX_POWER_W);
                KenwoodCommand::Power(Some(watts as u16))
            }
            other => return Err(RigError::NotAvailable(format!("set_level {}", other))),
        };
        send(io, command)
    }

    fn get_func(&mut self, io: &mut RigIo, _vfo: Vfo, func: Func) -> Result<bool, RigError> {
        let switch = switch_for(func)?;
        match query(io, KenwoodCommand::Switch(switch, None))? {
            KenwoodCommand::Switch(s, Some(v)) if s == switch => Ok(v != 0),
            other => Err(unexpected(&other)),
        }
    }

    fn set_func(&mut self, io: &mut RigIo, _vfo: Vfo, func: Func, on: bool) -> Result<(), RigError> {
        let switch = switch_for(func)?;
        send(io, KenwoodCommand::Switch(switch, Some(u8::from(on))))
    }

    fn get_rit(&mut self, io: &mut RigIo, _vfo: Vfo) -> Result<Offset, RigError> {
        Ok(read_info(io)?.rit_offset)
    }

    fn set_rit(&mut self, io: &mut RigIo, _vfo: Vfo, offset: Offset) -> Result<(), RigError> {
        set_offset(io, offset)
    }

    fn get_xit(&mut self, io: &mut RigIo, _vfo: Vfo) -> Result<Offset, RigError> {
        Ok(read_info(io)?.rit_offset)
    }

    fn set_xit(&mut self, io: &mut RigIo, _vfo: Vfo, offset: Offset) -> Result<(), RigError> {
        set_offset(io, offset)
    }

    fn get_info(&mut self, io: &mut RigIo) -> Result<String, RigError> {
        match query(io, KenwoodCommand::Id(None))? {
            KenwoodCommand::Id(Some(id)) => {
                Ok(format!("{} (ID {:03})", TS480_CAPS.model_name, id))
            }
            other => Err(unexpected(&other)),
        }
    }

    fn reset(&mut self, io: &mut RigIo) -> Result<(), RigError> {
        send(io, KenwoodCommand::Unknown("SR1".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rig_core::mock::{MockHandle, MockTransport};
    use rig_core::{Rig, RigConfig};
    use rig_protocol::kenwood::KenwoodInfo;

    fn script() -> MockTransport {
        let mut mock = MockTransport::new();
        mock.expect(b"FR;", b"FR0;");
        mock
    }

    /// Open a TS-480 session; the session asks for the RX VFO on open
    fn session(mock: MockTransport) -> (Rig, MockHandle) {
        let handle = mock.handle();
        let config = RigConfig {
            timeout_ms: 5,
            ..RigConfig::from_caps(&TS480_CAPS)
        };
        let mut rig = Rig::with_config(Box::new(Ts480::new()), config);
        rig.open(Box::new(mock)).unwrap();
        (rig, handle)
    }

    #[test]
    fn test_get_freq_b_is_targetable() {
        let mut mock = script();
        mock.expect(b"FB;", b"FB00007074000;");
        let (mut rig, handle) = session(mock);
        assert_eq!(rig.get_freq(Vfo::B).unwrap(), 7_074_000);
        assert_eq!(handle.write_count(), 2);
    }

    #[test]
    fn test_rejection_is_not_retried() {
        let mut mock = script();
        mock.expect(b"FA;", b"?;");
        let (mut rig, handle) = session(mock);
        assert!(matches!(
            rig.get_freq(Vfo::A),
            Err(RigError::Rejected(_))
        ));
        assert_eq!(handle.write_count(), 2);
    }

    #[test]
    fn test_truncated_reply_is_retried() {
        let mut mock = script();
        mock.expect(b"FA;", b"FA000140");
        mock.expect(b"FA;", b"FA00014074000;");
        let (mut rig, handle) = session(mock);
        assert_eq!(rig.get_freq(Vfo::A).unwrap(), 14_074_000);
        assert_eq!(handle.write_count(), 3);
        assert_eq!(rig.engine_stats().unwrap().retries, 1);
    }

    #[test]
    fn test_malformed_reply_is_retried() {
        let mut mock = script();
        mock.expect(b"MD;", b"MDX;");
        mock.expect(b"MD;", b"MD2;");
        let (mut rig, _handle) = session(mock);
        assert_eq!(rig.get_mode(Vfo::A).unwrap().0, Mode::Usb);
        assert_eq!(rig.engine_stats().unwrap().retries, 1);
    }

    #[test]
    fn test_mode_is_emulated_on_other_vfo() {
        let mut mock = script();
        mock.expect_silence(b"FR1;");
        mock.expect(b"MD;", b"MD3;");
        mock.expect_silence(b"FR0;");
        let (mut rig, handle) = session(mock);
        assert_eq!(rig.get_mode(Vfo::B).unwrap(), (Mode::Cw, 500));
        assert_eq!(handle.remaining(), 0);
    }

    #[test]
    fn test_ptt_and_split_from_info() {
        let info = KenwoodInfo {
            frequency_hz: 14_074_000,
            tx: true,
            mode: 2,
            vfo: 0,
            split: true,
            ..Default::default()
        };
        let frame = KenwoodCommand::Info(Some(info)).encode().unwrap();
        let mut mock = script();
        mock.expect(b"IF;", &frame);
        mock.expect(b"IF;", &frame);
        let (mut rig, _handle) = session(mock);
        assert_eq!(rig.get_ptt(Vfo::Current).unwrap(), Ptt::On);
        assert_eq!(rig.get_split_vfo(Vfo::Current).unwrap(), (Split::On, Vfo::B));
    }

    #[test]
    fn test_short_info_reply_is_protocol_error() {
        let mut mock = script();
        for _ in 0..4 {
            mock.expect(b"IF;", b"IF00014074000;");
        }
        let (mut rig, handle) = session(mock);
        assert!(matches!(
            rig.get_ptt(Vfo::Current),
            Err(RigError::Protocol(_))
        ));
        assert_eq!(handle.write_count(), 5);
    }

    #[test]
    fn test_set_split_frames() {
        let mut mock = script();
        mock.expect_silence(b"FR0;");
        mock.expect_silence(b"FT1;");
        let (mut rig, handle) = session(mock);
        rig.set_split_vfo(Vfo::Current, Split::On, Vfo::B).unwrap();
        assert_eq!(handle.remaining(), 0);
    }

    #[test]
    fn test_split_on_other_vfo_moves_current() {
        let mut mock = script();
        mock.expect_silence(b"FR1;");
        mock.expect_silence(b"FT0;");
        mock.expect(b"FR;", b"FR1;");
        let (mut rig, handle) = session(mock);
        assert_eq!(rig.state().vfo, Vfo::A);
        rig.set_split_vfo(Vfo::B, Split::On, Vfo::A).unwrap();
        assert_eq!(rig.state().vfo, Vfo::B);
        assert_eq!(rig.get_vfo().unwrap(), Vfo::B);
        assert_eq!(handle.remaining(), 0);
        assert_eq!(handle.write_count(), 4);
    }

    #[test]
    fn test_funcs() {
        let mut mock = script();
        mock.expect(b"NB;", b"NB1;");
        mock.expect(b"NR;", b"NR2;");
        mock.expect_silence(b"PR1;");
        mock.expect_silence(b"LK0;");
        let (mut rig, handle) = session(mock);
        assert!(rig.get_func(Vfo::Current, Func::Nb).unwrap());
        assert!(rig.get_func(Vfo::Current, Func::Nr).unwrap());
        rig.set_func(Vfo::Current, Func::Comp, true).unwrap();
        rig.set_func(Vfo::Current, Func::Lock, false).unwrap();
        assert!(matches!(
            rig.set_func(Vfo::Current, Func::Tuner, true),
            Err(RigError::NotAvailable(_))
        ));
        assert_eq!(handle.remaining(), 0);
    }

    #[test]
    fn test_rit_steps_from_zero() {
        let info = KenwoodInfo {
            frequency_hz: 14_074_000,
            rit_offset: -120,
            rit_on: true,
            mode: 2,
            ..Default::default()
        };
        let frame = KenwoodCommand::Info(Some(info)).encode().unwrap();
        let mut mock = script();
        mock.expect_silence(b"RC;");
        mock.expect_silence(b"RD00120;");
        mock.expect(b"IF;", &frame);
        mock.expect_silence(b"RC;");
        let (mut rig, handle) = session(mock);
        rig.set_rit(Vfo::Current, -120).unwrap();
        assert_eq!(rig.get_rit(Vfo::Current).unwrap(), -120);
        rig.set_xit(Vfo::Current, 0).unwrap();
        assert!(matches!(
            rig.set_rit(Vfo::Current, 12_000),
            Err(RigError::OutOfRange(_))
        ));
        assert_eq!(handle.remaining(), 0);
    }

    #[test]
    fn test_levels() {
        let mut mock = script();
        mock.expect(b"AG0;", b"AG0255;");
        mock.expect_silence(b"PC050;");
        mock.expect_silence(b"PC005;");
        let (mut rig, _handle) = session(mock);
        assert_eq!(rig.get_level(Vfo::A, Level::Af).unwrap(), Value::Float(1.0));
        rig.set_level(Vfo::A, Level::RfPower, Value::Float(0.5)).unwrap();
        rig.set_level(Vfo::A, Level::RfPower, Value::Float(0.0)).unwrap();
    }

    #[test]
    fn test_info_and_reset() {
        let mut mock = script();
        mock.expect(b"ID;", b"ID020;");
        mock.expect_silence(b"SR1;");
        let (mut rig, _handle) = session(mock);
        assert_eq!(rig.get_info().unwrap(), "TS-480 (ID 020)");
        rig.reset().unwrap();
    }

    #[test]
    fn test_open_fails_over_to_vfo_a() {
        let (rig, handle) = session(MockTransport::silent());
        assert_eq!(rig.state().vfo, Vfo::A);
        assert_eq!(handle.write_count(), 4);
    }
}
