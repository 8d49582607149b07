//! Emulated Yaesu FT-817

use rig_protocol::yaesu::{self, rx_status, tx_status, YaesuCodec, YaesuCommand};
use rig_protocol::{Freq, ProtocolCodec};
use tracing::{debug, warn};

use crate::config::VirtualRigConfig;
use crate::device::Emulator;

/// A Yaesu radio answering 5-byte binary commands
pub struct VirtualYaesu {
    codec: YaesuCodec,
    /// Frequency per VFO, A then B
    pub freqs: [Freq; 2],
    /// Raw mode byte per VFO
    pub modes: [u8; 2],
    /// Index of the active VFO
    pub vfo: usize,
    pub transmitting: bool,
    pub split: bool,
    pub locked: bool,
    /// S-meter nibble, 0..=15
    pub s_meter: u8,
    pub squelch_open: bool,
    /// Power meter nibble while transmitting
    pub power_meter: u8,
}

impl VirtualYaesu {
    pub fn new(config: &VirtualRigConfig) -> Self {
        let mode = yaesu::mode_to_byte(config.mode).unwrap_or(0x01);
        Self {
            codec: YaesuCodec::new(),
            freqs: [config.frequency_a_hz, config.frequency_b_hz],
            modes: [mode, mode],
            vfo: 0,
            transmitting: false,
            split: false,
            locked: false,
            s_meter: 9,
            squelch_open: true,
            power_meter: 15,
        }
    }

    fn rx_status(&self) -> u8 {
        let mut status = self.s_meter & rx_status::S_METER_MASK;
        if !self.squelch_open {
            status |= rx_status::SQUELCH_CLOSED;
        }
        status
    }

    fn tx_status(&self) -> u8 {
        if !self.transmitting {
            return 0xFF;
        }
        let mut status = self.power_meter & tx_status::METER_MASK;
        if self.split {
            status |= tx_status::SPLIT;
        }
        status
    }
}

impl Emulator for VirtualYaesu {
    type Command = YaesuCommand;

    fn name(&self) -> &'static str {
        "FT-817"
    }

    fn push_bytes(&mut self, data: &[u8]) {
        self.codec.push_bytes(data);
    }

    fn next_command(&mut self) -> Option<YaesuCommand> {
        self.codec.next_command()
    }

    fn respond(&mut self, command: &YaesuCommand) -> Option<Vec<u8>> {
        match command {
            YaesuCommand::SetFrequency { hz } if !self.locked => self.freqs[self.vfo] = *hz,
            YaesuCommand::ReadFreqMode => {
                return match yaesu::encode_freq_mode(self.freqs[self.vfo], self.modes[self.vfo]) {
                    Ok(reply) => Some(reply),
                    Err(e) => {
                        warn!("FT-817 cannot report {} Hz: {}", self.freqs[self.vfo], e);
                        None
                    }
                };
            }
            YaesuCommand::SetMode { mode } if !self.locked => self.modes[self.vfo] = *mode,
            YaesuCommand::PttOn => self.transmitting = true,
            YaesuCommand::PttOff => self.transmitting = false,
            YaesuCommand::ToggleVfo if !self.locked => self.vfo ^= 1,
            YaesuCommand::SplitOn => self.split = true,
            YaesuCommand::SplitOff => self.split = false,
            YaesuCommand::ReadRxStatus => return Some(vec![self.rx_status()]),
            YaesuCommand::ReadTxStatus => return Some(vec![self.tx_status()]),
            YaesuCommand::LockOn => self.locked = true,
            YaesuCommand::LockOff => self.locked = false,
            other => debug!("FT-817 ignoring {:?}", other),
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SimTransport;
    use rig_core::Transport;
    use std::time::Duration;

    fn reply(t: &mut SimTransport<VirtualYaesu>, frame: &[u8]) -> Vec<u8> {
        t.write(frame).unwrap();
        let mut buf = [0u8; 8];
        match t.read(&mut buf, Duration::ZERO) {
            Ok(n) => buf[..n].to_vec(),
            Err(_) => Vec::new(),
        }
    }

    #[test]
    fn test_freq_mode_per_vfo() {
        let mut t = SimTransport::new(VirtualYaesu::new(&VirtualRigConfig::default()));
        assert_eq!(
            reply(&mut t, &[0, 0, 0, 0, 0x03]),
            vec![0x01, 0x40, 0x74, 0x00, 0x01]
        );
        reply(&mut t, &[0, 0, 0, 0, 0x81]);
        assert_eq!(
            reply(&mut t, &[0, 0, 0, 0, 0x03]),
            vec![0x00, 0x70, 0x74, 0x00, 0x01]
        );
    }

    #[test]
    fn test_tx_status_only_while_keyed() {
        let mut t = SimTransport::new(VirtualYaesu::new(&VirtualRigConfig::default()));
        assert_eq!(reply(&mut t, &[0, 0, 0, 0, 0xF7]), vec![0xFF]);
        reply(&mut t, &[0, 0, 0, 0, 0x02]);
        reply(&mut t, &[0, 0, 0, 0, 0x08]);
        assert_eq!(reply(&mut t, &[0, 0, 0, 0, 0xF7]), vec![0x2F]);
    }

    #[test]
    fn test_lock_blocks_tuning() {
        let mut t = SimTransport::new(VirtualYaesu::new(&VirtualRigConfig::default()));
        reply(&mut t, &[0, 0, 0, 0, 0x00]);
        reply(&mut t, &[0x00, 0x70, 0x00, 0x00, 0x01]);
        assert_eq!(t.handle().with_radio(|r| r.freqs[0]), 14_074_000);
    }
}
