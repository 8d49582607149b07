//! Emulated Ten-Tec Omni VII / Jupiter

use std::collections::HashMap;

use rig_protocol::tentec::{
    self, TenTecCodec, TenTecCommand, TenTecMeter, TenTecReply, TT538_FILTERS, TT588_FILTERS,
};
use rig_protocol::{Freq, Mode, ProtocolCodec};
use tracing::debug;

use crate::config::VirtualRigConfig;
use crate::device::{encode_reply, Emulator};

/// A Ten-Tec radio answering the binary CR-terminated protocol
pub struct VirtualTenTec {
    name: &'static str,
    version: &'static str,
    filter_count: usize,
    codec: TenTecCodec,
    pub freq_a: u32,
    pub freq_b: u32,
    pub mode_a: u8,
    pub mode_b: u8,
    pub filter: u8,
    pub ptt: bool,
    pub split: bool,
    registers: HashMap<TenTecMeter, u8>,
    /// S-meter as (S units, dB over S9)
    pub signal: (u8, u8),
}

fn default_registers() -> HashMap<TenTecMeter, u8> {
    HashMap::from([
        (TenTecMeter::Volume, 64),
        (TenTecMeter::RfGain, 0),
        (TenTecMeter::Agc, b'2'),
        (TenTecMeter::Squelch, 0),
        (TenTecMeter::Attenuator, 0),
        (TenTecMeter::Power, 0),
        (TenTecMeter::Forward, 0),
        (TenTecMeter::Reflected, 0),
    ])
}

fn clamp_hz(hz: Freq) -> u32 {
    u32::try_from(hz).unwrap_or(u32::MAX)
}

impl VirtualTenTec {
    fn build(
        name: &'static str,
        version: &'static str,
        filters: &'static [u32],
        config: &VirtualRigConfig,
    ) -> Self {
        let mode = tentec::mode_to_char(config.mode)
            .or_else(|_| tentec::mode_to_char(Mode::Usb))
            .unwrap_or(b'1');
        Self {
            name,
            version,
            filter_count: filters.len(),
            codec: TenTecCodec::new(),
            freq_a: clamp_hz(config.frequency_a_hz),
            freq_b: clamp_hz(config.frequency_b_hz),
            mode_a: mode,
            mode_b: mode,
            filter: 0,
            ptt: false,
            split: false,
            registers: default_registers(),
            signal: (9, 0),
        }
    }

    /// Omni VII with the given starting state
    pub fn tt588(config: &VirtualRigConfig) -> Self {
        Self::build("TT-588", "VER 1.010", TT588_FILTERS, config)
    }

    /// Jupiter with the given starting state
    pub fn tt538(config: &VirtualRigConfig) -> Self {
        Self::build("TT-538", "VER 1.3", TT538_FILTERS, config)
    }

    pub fn register(&self, meter: TenTecMeter) -> u8 {
        self.registers.get(&meter).copied().unwrap_or(0)
    }

    pub fn set_register(&mut self, meter: TenTecMeter, value: u8) {
        self.registers.insert(meter, value);
    }

    fn frequency(&mut self, vfo: u8) -> &mut u32 {
        if vfo == b'B' {
            &mut self.freq_b
        } else {
            &mut self.freq_a
        }
    }
}

impl Emulator for VirtualTenTec {
    type Command = TenTecCommand;

    fn name(&self) -> &'static str {
        self.name
    }

    fn push_bytes(&mut self, data: &[u8]) {
        self.codec.push_bytes(data);
    }

    fn next_command(&mut self) -> Option<TenTecCommand> {
        self.codec.next_command()
    }

    fn respond(&mut self, command: &TenTecCommand) -> Option<Vec<u8>> {
        match command {
            TenTecCommand::GetFrequency { vfo } => encode_reply(TenTecReply::Frequency {
                vfo: *vfo,
                hz: *self.frequency(*vfo),
            }),
            TenTecCommand::SetFrequency { vfo, hz } => {
                *self.frequency(*vfo) = *hz;
                None
            }
            TenTecCommand::GetMode => encode_reply(TenTecReply::Mode {
                mode_a: self.mode_a,
                mode_b: self.mode_b,
            }),
            TenTecCommand::SetMode { mode_a, mode_b } => {
                self.mode_a = *mode_a;
                self.mode_b = *mode_b;
                None
            }
            TenTecCommand::GetFilter => encode_reply(TenTecReply::Filter { index: self.filter }),
            TenTecCommand::SetFilter { index } => {
                if usize::from(*index) < self.filter_count {
                    self.filter = *index;
                } else {
                    debug!("{} ignoring filter index {}", self.name, index);
                }
                None
            }
            TenTecCommand::SetPtt(on) => {
                self.ptt = *on;
                None
            }
            TenTecCommand::GetSplit => encode_reply(TenTecReply::Split(self.split)),
            TenTecCommand::SetSplit(on) => {
                self.split = *on;
                None
            }
            TenTecCommand::GetMeter(TenTecMeter::Signal) => encode_reply(TenTecReply::Signal {
                s_units: self.signal.0,
                over_db: self.signal.1,
            }),
            TenTecCommand::GetMeter(TenTecMeter::Power) => {
                encode_reply(TenTecReply::Power(self.register(TenTecMeter::Power)))
            }
            TenTecCommand::GetMeter(meter) => {
                encode_reply(TenTecReply::Meter(*meter, self.register(*meter)))
            }
            TenTecCommand::SetMeter(meter, value) => {
                self.set_register(*meter, *value);
                None
            }
            TenTecCommand::GetVersion => {
                encode_reply(TenTecReply::Version(self.version.to_string()))
            }
            TenTecCommand::Reset => {
                self.ptt = false;
                encode_reply(TenTecReply::Banner)
            }
            TenTecCommand::Unknown(bytes) => {
                debug!("{} ignoring {:02X?}", self.name, bytes);
                None
            }
        }
    }

    fn is_reset(&self, command: &TenTecCommand) -> bool {
        matches!(command, TenTecCommand::Reset)
    }
}
