//! Yaesu FT-817
//!
//! Every command is five bytes with the opcode last. Only three commands
//! answer: frequency/mode (5 bytes), RX status and TX status (1 byte each).
//! The radio cannot report its VFO, so the selection is tracked here and
//! changed with the A/B toggle.

use rig_core::{Command, RigBackend, RigIo};
use rig_protocol::caps::{
    FreqRange, FuncSet, Handshake, Op, ParmSet, Parity, PortCaps, PortType, RigCaps, RigStatus,
    RigType, Targetable, TuningStep,
};
use rig_protocol::yaesu::{self, rx_status, tx_status, YaesuCommand, FREQ_MODE_REPLY_LEN};
use rig_protocol::{EncodeCommand, Freq, Level, Mode, Ptt, RigError, Split, Value, Vfo, Width};
use tracing::debug;

use crate::ranges::{rx_range, tx_range};

const VFOS: &[Vfo] = &[Vfo::A, Vfo::B];

const MODES: &[Mode] = &[
    Mode::Lsb,
    Mode::Usb,
    Mode::Cw,
    Mode::CwR,
    Mode::Am,
    Mode::Fm,
    Mode::Rtty,
    Mode::PktFm,
];
const TX_MODES: &[Mode] = &[
    Mode::Lsb,
    Mode::Usb,
    Mode::Cw,
    Mode::CwR,
    Mode::Fm,
    Mode::Rtty,
    Mode::PktFm,
];
const AM: &[Mode] = &[Mode::Am];

const TX_RANGES: &[FreqRange] = &[
    tx_range(1_800_000, 2_000_000, TX_MODES, 500, 5_000, VFOS, 0b11),
    tx_range(1_800_000, 2_000_000, AM, 500, 1_500, VFOS, 0b11),
    tx_range(3_500_000, 4_000_000, TX_MODES, 500, 5_000, VFOS, 0b11),
    tx_range(3_500_000, 4_000_000, AM, 500, 1_500, VFOS, 0b11),
    tx_range(7_000_000, 7_300_000, TX_MODES, 500, 5_000, VFOS, 0b11),
    tx_range(7_000_000, 7_300_000, AM, 500, 1_500, VFOS, 0b11),
    tx_range(10_000_000, 10_150_000, TX_MODES, 500, 5_000, VFOS, 0b11),
    tx_range(10_000_000, 10_150_000, AM, 500, 1_500, VFOS, 0b11),
    tx_range(14_000_000, 14_350_000, TX_MODES, 500, 5_000, VFOS, 0b11),
    tx_range(14_000_000, 14_350_000, AM, 500, 1_500, VFOS, 0b11),
    tx_range(18_068_000, 18_168_000, TX_MODES, 500, 5_000, VFOS, 0b11),
    tx_range(18_068_000, 18_168_000, AM, 500, 1_500, VFOS, 0b11),
    tx_range(21_000_000, 21_450_000, TX_MODES, 500, 5_000, VFOS, 0b11),
    tx_range(21_000_000, 21_450_000, AM, 500, 1_500, VFOS, 0b11),
    tx_range(24_890_000, 24_990_000, TX_MODES, 500, 5_000, VFOS, 0b11),
    tx_range(24_890_000, 24_990_000, AM, 500, 1_500, VFOS, 0b11),
    tx_range(28_000_000, 29_700_000, TX_MODES, 500, 5_000, VFOS, 0b11),
    tx_range(28_000_000, 29_700_000, AM, 500, 1_500, VFOS, 0b11),
    tx_range(50_000_000, 54_000_000, TX_MODES, 500, 5_000, VFOS, 0b11),
    tx_range(50_000_000, 54_000_000, AM, 500, 1_500, VFOS, 0b11),
    tx_range(144_000_000, 148_000_000, TX_MODES, 500, 5_000, VFOS, 0b11),
    tx_range(144_000_000, 148_000_000, AM, 500, 1_500, VFOS, 0b11),
    tx_range(430_000_000, 440_000_000, TX_MODES, 500, 5_000, VFOS, 0b11),
    tx_range(430_000_000, 440_000_000, AM, 500, 1_500, VFOS, 0b11),
];

/// FT-817
pub const FT817_CAPS: RigCaps = RigCaps {
    model: 120,
    model_name: "FT-817",
    manufacturer: "Yaesu",
    version: "20220419.0",
    status: RigStatus::Stable,
    rig_type: RigType::Transceiver,
    port: PortCaps {
        port_type: PortType::Serial,
        serial_rate_min: 4800,
        serial_rate_max: 38400,
        data_bits: 8,
        stop_bits: 2,
        parity: Parity::None,
        handshake: Handshake::None,
        write_delay_ms: 5,
        post_write_delay_ms: 5,
        timeout_ms: 100,
        retry: 0,
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
    ],
    targetable: Targetable {
        freq: false,
        mode: false,
    },
    modes: MODES,
    vfos: VFOS,
    get_levels: &[Level::Strength, Level::RfPower],
    set_levels: &[],
    level_gran: &[],
    preamp: &[],
    attenuator: &[],
    get_funcs: FuncSet::EMPTY,
    set_funcs: FuncSet::EMPTY,
    get_parms: ParmSet::EMPTY,
    set_parms: ParmSet::EMPTY,
    parm_gran: &[],
    max_rit: 0,
    max_xit: 0,
    rx_ranges: &[
        rx_range(100_000, 56_000_000, MODES, VFOS, 0b11),
        rx_range(108_000_000, 154_000_000, MODES, VFOS, 0b11),
        rx_range(420_000_000, 470_000_000, MODES, VFOS, 0b11),
    ],
    tx_ranges: TX_RANGES,
    tuning_steps: &[
        TuningStep { modes: MODES, step: 10 },
        TuningStep { modes: MODES, step: 100 },
    ],
    filters: &[],
    channels: &[],
};

/// FT-817 backend
#[derive(Debug)]
pub struct Ft817 {
    vfo: Vfo,
    /// Last split state we set; the radio only reports it while keyed
    split: Split,
}

impl Ft817 {
    pub fn new() -> Self {
        Self {
            vfo: Vfo::A,
            split: Split::Off,
        }
    }

    fn read_status(&self, io: &mut RigIo, command: YaesuCommand) -> Result<u8, RigError> {
        let len = command.reply_len();
        let reply = io.transact(&Command::fixed(command.encode()?, len))?;
        reply
            .first()
            .copied()
            .ok_or_else(|| RigError::Protocol("empty status reply".into()))
    }
}

impl Default for Ft817 {
    fn default() -> Self {
        Self::new()
    }
}

fn send(io: &mut RigIo, command: YaesuCommand) -> Result<(), RigError> {
    io.transact(&Command::write_only(command.encode()?))?;
    Ok(())
}

fn keyed(tx: u8) -> bool {
    tx & tx_status::PTT_OFF == 0
}

impl RigBackend for Ft817 {
    fn caps(&self) -> &'static RigCaps {
        &FT817_CAPS
    }

    fn get_freq(&mut self, io: &mut RigIo, _vfo: Vfo) -> Result<Freq, RigError> {
        let reply = io.transact(&Command::fixed(
            YaesuCommand::ReadFreqMode.encode()?,
            FREQ_MODE_REPLY_LEN,
        ))?;
        let (hz, _) = yaesu::decode_freq_mode(&reply)?;
        Ok(hz)
    }

    fn set_freq(&mut self, io: &mut RigIo, _vfo: Vfo, freq: Freq) -> Result<(), RigError> {
        send(io, YaesuCommand::SetFrequency { hz: freq })
    }

    fn get_mode(&mut self, io: &mut RigIo, _vfo: Vfo) -> Result<(Mode, Width), RigError> {
        let reply = io.transact(&Command::fixed(
            YaesuCommand::ReadFreqMode.encode()?,
            FREQ_MODE_REPLY_LEN,
        ))?;
        let (_, raw) = yaesu::decode_freq_mode(&reply)?;
        // High bit marks the narrow filter
        let mode = yaesu::mode_from_byte(raw & 0x7F)?;
        Ok((mode, 0))
    }

    fn set_mode(
        &mut self,
        io: &mut RigIo,
        _vfo: Vfo,
        mode: Mode,
        _width: Width,
    ) -> Result<(), RigError> {
        send(
            io,
            YaesuCommand::SetMode {
                mode: yaesu::mode_to_byte(mode)?,
            },
        )
    }

    fn get_vfo(&mut self, _io: &mut RigIo) -> Result<Vfo, RigError> {
        Ok(self.vfo)
    }

    fn set_vfo(&mut self, io: &mut RigIo, vfo: Vfo) -> Result<(), RigError> {
        let vfo = vfo.canonical();
        if !VFOS.contains(&vfo) {
            return Err(RigError::InvalidParam(format!("{} on FT-817", vfo)));
        }
        if vfo != self.vfo {
            send(io, YaesuCommand::ToggleVfo)?;
            self.vfo = vfo;
        } else {
            debug!("FT-817 already on {}", vfo);
        }
        Ok(())
    }

    fn get_ptt(&mut self, io: &mut RigIo, _vfo: Vfo) -> Result<Ptt, RigError> {
        let tx = self.read_status(io, YaesuCommand::ReadTxStatus)?;
        Ok(Ptt::from(keyed(tx)))
    }

    fn set_ptt(&mut self, io: &mut RigIo, _vfo: Vfo, ptt: Ptt) -> Result<(), RigError> {
        send(
            io,
            if ptt.is_on() {
                YaesuCommand::PttOn
            } else {
                YaesuCommand::PttOff
            },
        )
    }

    fn get_split_vfo(&mut self, io: &mut RigIo, _vfo: Vfo) -> Result<(Split, Vfo), RigError> {
        let tx = self.read_status(io, YaesuCommand::ReadTxStatus)?;
        if keyed(tx) {
            self.split = Split::from(tx & tx_status::SPLIT != 0);
        }
        let tx_vfo = if self.split.is_on() {
            self.vfo.other().unwrap_or(Vfo::B)
        } else {
            self.vfo
        };
        Ok((self.split, tx_vfo))
    }

    fn set_split_vfo(
        &mut self,
        io: &mut RigIo,
        _vfo: Vfo,
        split: Split,
        _tx_vfo: Vfo,
    ) -> Result<(), RigError> {
        send(
            io,
            if split.is_on() {
                YaesuCommand::SplitOn
            } else {
                YaesuCommand::SplitOff
            },
        )?;
        self.split = split;
        Ok(())
    }

    fn get_level(&mut self, io: &mut RigIo, _vfo: Vfo, level: Level) -> Result<Value, RigError> {
        match level {
            Level::Strength => {
                let rx = self.read_status(io, YaesuCommand::ReadRxStatus)?;
                if rx & rx_status::SQUELCH_CLOSED != 0 {
                    debug!("FT-817 squelch closed, meter may read low");
                }
                Ok(Value::Int(yaesu::strength_from_rx_status(rx)))
            }
            Level::RfPower => {
                let tx = self.read_status(io, YaesuCommand::ReadTxStatus)?;
                if !keyed(tx) {
                    return Err(RigError::Rejected("rig not keyed".into()));
                }
                Ok(Value::Float(
                    f32::from(tx & tx_status::METER_MASK) / f32::from(tx_status::METER_MASK),
                ))
            }
            other => Err(RigError::NotAvailable(format!("get_level {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rig_core::mock::{MockHandle, MockTransport};
    use rig_core::{Rig, RigConfig};

    fn session(mock: MockTransport) -> (Rig, MockHandle) {
        let handle = mock.handle();
        let config = RigConfig {
            timeout_ms: 5,
            write_delay_ms: 0,
            post_write_delay_ms: 0,
            ..RigConfig::from_caps(&FT817_CAPS)
        };
        let mut rig = Rig::with_config(Box::new(Ft817::new()), config);
        rig.open(Box::new(mock)).unwrap();
        (rig, handle)
    }

    const READ: [u8; 5] = [0, 0, 0, 0, 0x03];
    const TOGGLE: [u8; 5] = [0, 0, 0, 0, 0x81];
    const TX_STATUS: [u8; 5] = [0, 0, 0, 0, 0xF7];

    #[test]
    fn test_get_freq_and_mode() {
        let mut mock = MockTransport::new();
        mock.expect(&READ, &[0x01, 0x40, 0x74, 0x00, 0x01]);
        mock.expect(&READ, &[0x01, 0x40, 0x74, 0x00, 0x82]);
        let (mut rig, _handle) = session(mock);
        assert_eq!(rig.get_freq(Vfo::Current).unwrap(), 14_074_000);
        assert_eq!(rig.get_mode(Vfo::Current).unwrap(), (Mode::Cw, 0));
    }

    #[test]
    fn test_no_retry_on_timeout() {
        let (mut rig, handle) = session(MockTransport::silent());
        assert_eq!(rig.get_freq(Vfo::Current), Err(RigError::Timeout));
        assert_eq!(handle.write_count(), 1);
    }

    #[test]
    fn test_other_vfo_toggles_and_restores() {
        let mut mock = MockTransport::new();
        mock.expect_silence(&TOGGLE);
        mock.expect(&READ, &[0x00, 0x70, 0x74, 0x00, 0x00]);
        mock.expect_silence(&TOGGLE);
        let (mut rig, handle) = session(mock);
        assert_eq!(rig.get_freq(Vfo::B).unwrap(), 7_074_000);
        assert_eq!(handle.remaining(), 0);
        assert_eq!(rig.state().vfo, Vfo::A);
    }

    #[test]
    fn test_set_vfo_only_toggles_on_change() {
        let mut mock = MockTransport::new();
        mock.expect_silence(&TOGGLE);
        let (mut rig, handle) = session(mock);
        rig.set_vfo(Vfo::A).unwrap();
        assert_eq!(handle.write_count(), 0);
        rig.set_vfo(Vfo::B).unwrap();
        assert_eq!(handle.write_count(), 1);
        assert_eq!(rig.get_vfo().unwrap(), Vfo::B);
    }

    #[test]
    fn test_ptt_from_tx_status() {
        let mut mock = MockTransport::new();
        mock.expect(&TX_STATUS, &[0xFF]);
        mock.expect(&TX_STATUS, &[0x25]);
        let (mut rig, _handle) = session(mock);
        assert_eq!(rig.get_ptt(Vfo::Current).unwrap(), Ptt::Off);
        rig.invalidate_cache(rig_core::CacheKind::Ptt, Vfo::Current)
            .unwrap();
        assert_eq!(rig.get_ptt(Vfo::Current).unwrap(), Ptt::On);
    }

    #[test]
    fn test_split_remembered_while_receiving() {
        let mut mock = MockTransport::new();
        mock.expect_silence(&[0, 0, 0, 0, 0x02]);
        mock.expect(&TX_STATUS, &[0xFF]);
        let (mut rig, _handle) = session(mock);
        rig.set_split_vfo(Vfo::A, Split::On, Vfo::B).unwrap();
        rig.invalidate_cache(rig_core::CacheKind::Split, Vfo::A)
            .unwrap();
        assert_eq!(rig.get_split_vfo(Vfo::A).unwrap(), (Split::On, Vfo::B));
    }

    #[test]
    fn test_levels() {
        let mut mock = MockTransport::new();
        mock.expect(&[0, 0, 0, 0, 0xE7], &[0x09]);
        mock.expect(&TX_STATUS, &[0x0F]);
        mock.expect(&TX_STATUS, &[0xFF]);
        let (mut rig, _handle) = session(mock);
        assert_eq!(
            rig.get_level(Vfo::Current, Level::Strength).unwrap(),
            Value::Int(0)
        );
        assert_eq!(
            rig.get_level(Vfo::Current, Level::RfPower).unwrap(),
            Value::Float(1.0)
        );
        assert!(matches!(
            rig.get_level(Vfo::Current, Level::RfPower),
            Err(RigError::Rejected(_))
        ));
        assert!(matches!(
            rig.set_level(Vfo::Current, Level::Af, Value::Float(0.5)),
            Err(RigError::NotAvailable(_))
        ));
    }

    #[test]
    fn test_wide_fm_is_not_settable() {
        let (mut rig, handle) = session(MockTransport::silent());
        assert!(matches!(
            rig.set_mode(Vfo::Current, Mode::Wfm, 0),
            Err(RigError::InvalidParam(_))
        ));
        assert_eq!(handle.write_count(), 0);
    }
}
