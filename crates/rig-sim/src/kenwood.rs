//! Emulated Kenwood TS-480

use std::collections::HashMap;

use rig_protocol::kenwood::{self, KenwoodCodec, KenwoodCommand, KenwoodInfo, KenwoodSwitch};
use rig_protocol::{Freq, ProtocolCodec};
use tracing::debug;

use crate::config::VirtualRigConfig;
use crate::device::{encode_reply, Emulator};

/// Radio ID reported by the TS-480
pub const TS480_ID: u16 = 20;

/// RIT/XIT offset limit in Hz
const MAX_OFFSET: i32 = 9999;

/// A Kenwood radio answering `;`-terminated ASCII commands
pub struct VirtualKenwood {
    codec: KenwoodCodec,
    config: VirtualRigConfig,
    pub freq_a: Freq,
    pub freq_b: Freq,
    /// Kenwood mode digit
    pub mode: u8,
    /// 0 = VFO A, 1 = VFO B
    pub rx_vfo: u8,
    pub tx_vfo: u8,
    pub transmitting: bool,
    pub af_gain: u16,
    pub rf_gain: u16,
    pub squelch: u16,
    /// Output power in watts
    pub power: u16,
    pub switches: HashMap<KenwoodSwitch, u8>,
    /// Shared RIT/XIT offset in Hz
    pub rit_offset: i32,
}

impl VirtualKenwood {
    pub fn new(config: &VirtualRigConfig) -> Self {
        let mode = kenwood::mode_to_digit(config.mode).unwrap_or(2);
        Self {
            codec: KenwoodCodec::new(),
            config: config.clone(),
            freq_a: config.frequency_a_hz,
            freq_b: config.frequency_b_hz,
            mode,
            rx_vfo: 0,
            tx_vfo: 0,
            transmitting: false,
            af_gain: 128,
            rf_gain: 255,
            squelch: 0,
            power: 100,
            switches: HashMap::new(),
            rit_offset: 0,
        }
    }

    fn switch(&self, switch: KenwoodSwitch) -> u8 {
        self.switches.get(&switch).copied().unwrap_or(0)
    }

    fn info(&self) -> KenwoodInfo {
        KenwoodInfo {
            frequency_hz: if self.rx_vfo == 1 {
                self.freq_b
            } else {
                self.freq_a
            },
            rit_offset: self.rit_offset,
            rit_on: self.switch(KenwoodSwitch::Rit) != 0,
            xit_on: self.switch(KenwoodSwitch::Xit) != 0,
            tx: self.transmitting,
            mode: self.mode,
            vfo: self.rx_vfo,
            split: self.rx_vfo != self.tx_vfo,
            ..Default::default()
        }
    }
}

fn rejected() -> Option<Vec<u8>> {
    Some(kenwood::REJECTED.to_vec())
}

impl Emulator for VirtualKenwood {
    type Command = KenwoodCommand;

    fn name(&self) -> &'static str {
        "TS-480"
    }

    fn push_bytes(&mut self, data: &[u8]) {
        self.codec.push_bytes(data);
    }

    fn next_command(&mut self) -> Option<KenwoodCommand> {
        self.codec.next_command()
    }

    fn respond(&mut self, command: &KenwoodCommand) -> Option<Vec<u8>> {
        use KenwoodCommand as K;
        match command {
            K::FrequencyA(None) => encode_reply(K::FrequencyA(Some(self.freq_a))),
            K::FrequencyA(Some(hz)) => {
                self.freq_a = *hz;
                None
            }
            K::FrequencyB(None) => encode_reply(K::FrequencyB(Some(self.freq_b))),
            K::FrequencyB(Some(hz)) => {
                self.freq_b = *hz;
                None
            }
            K::Mode(None) => encode_reply(K::Mode(Some(self.mode))),
            K::Mode(Some(digit)) => match kenwood::mode_from_digit(*digit) {
                Ok(_) => {
                    self.mode = *digit;
                    None
                }
                Err(_) => rejected(),
            },
            K::RxVfo(None) => encode_reply(K::RxVfo(Some(self.rx_vfo))),
            // FR moves the transmitter along with the receiver
            K::RxVfo(Some(v @ (0 | 1))) => {
                self.rx_vfo = *v;
                self.tx_vfo = *v;
                None
            }
            K::TxVfo(None) => encode_reply(K::TxVfo(Some(self.tx_vfo))),
            K::TxVfo(Some(v @ (0 | 1))) => {
                self.tx_vfo = *v;
                None
            }
            K::Transmit => {
                self.transmitting = true;
                None
            }
            K::Receive => {
                self.transmitting = false;
                None
            }
            K::Info(None) => encode_reply(K::Info(Some(self.info()))),
            K::Id(None) => encode_reply(K::Id(Some(TS480_ID))),
            K::AfGain(None) => encode_reply(K::AfGain(Some(self.af_gain))),
            K::AfGain(Some(v)) => {
                self.af_gain = (*v).min(255);
                None
            }
            K::RfGain(None) => encode_reply(K::RfGain(Some(self.rf_gain))),
            K::RfGain(Some(v)) => {
                self.rf_gain = (*v).min(255);
                None
            }
            K::Squelch(None) => encode_reply(K::Squelch(Some(self.squelch))),
            K::Squelch(Some(v)) => {
                self.squelch = (*v).min(255);
                None
            }
            K::Power(None) => encode_reply(K::Power(Some(self.power))),
            K::Power(Some(w)) => {
                self.power = (*w).clamp(5, 100);
                None
            }
            K::Switch(switch, None) => encode_reply(K::Switch(*switch, Some(self.switch(*switch)))),
            K::Switch(KenwoodSwitch::NoiseReduction, Some(v @ 0..=2)) => {
                self.switches.insert(KenwoodSwitch::NoiseReduction, *v);
                None
            }
            K::Switch(switch, Some(v @ (0 | 1))) => {
                self.switches.insert(*switch, *v);
                None
            }
            K::RitClear => {
                self.rit_offset = 0;
                None
            }
            K::RitUp(Some(hz)) => {
                let hz = i32::try_from(*hz).unwrap_or(MAX_OFFSET);
                self.rit_offset = self.rit_offset.saturating_add(hz).min(MAX_OFFSET);
                None
            }
            K::RitDown(Some(hz)) => {
                let hz = i32::try_from(*hz).unwrap_or(MAX_OFFSET);
                self.rit_offset = self.rit_offset.saturating_sub(hz).max(-MAX_OFFSET);
                None
            }
            K::Unknown(s) if s == "SR1" => {
                debug!("TS-480 reset");
                let codec = std::mem::take(&mut self.codec);
                *self = Self::new(&self.config);
                self.codec = codec;
                None
            }
            other => {
                debug!("TS-480 rejecting {:?}", other);
                rejected()
            }
        }
    }

    fn is_reset(&self, command: &KenwoodCommand) -> bool {
        matches!(command, KenwoodCommand::Unknown(s) if s == "SR1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SimTransport;
    use rig_core::Transport;
    use std::time::Duration;

    fn reply(t: &mut SimTransport<VirtualKenwood>, frame: &[u8]) -> Vec<u8> {
        t.write(frame).unwrap();
        let mut out = Vec::new();
        let mut buf = [0u8; 64];
        while let Ok(n) = t.read(&mut buf, Duration::ZERO) {
            out.extend_from_slice(&buf[..n]);
        }
        out
    }

    fn radio() -> SimTransport<VirtualKenwood> {
        SimTransport::new(VirtualKenwood::new(&VirtualRigConfig::default()))
    }

    #[test]
    fn test_frequency() {
        let mut t = radio();
        assert_eq!(reply(&mut t, b"FA;"), b"FA00014074000;".to_vec());
        reply(&mut t, b"FB00003573000;");
        assert_eq!(reply(&mut t, b"FB;"), b"FB00003573000;".to_vec());
    }

    #[test]
    fn test_unknown_is_rejected() {
        let mut t = radio();
        assert_eq!(reply(&mut t, b"ZZ;"), b"?;".to_vec());
        assert_eq!(reply(&mut t, b"MD8;"), b"?;".to_vec());
    }

    #[test]
    fn test_split_in_info() {
        let mut t = radio();
        reply(&mut t, b"FR0;FT1;TX;");
        let frame = reply(&mut t, b"IF;");
        assert_eq!(frame.len(), kenwood::IF_REPLY_LEN);
        match kenwood::decode_reply(&frame).unwrap() {
            KenwoodCommand::Info(Some(info)) => {
                assert!(info.split);
                assert!(info.tx);
                assert_eq!(info.frequency_hz, 14_074_000);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_switches_and_offset() {
        let mut t = radio();
        assert_eq!(reply(&mut t, b"NB;"), b"NB0;".to_vec());
        reply(&mut t, b"NB1;NR2;RT1;");
        assert_eq!(reply(&mut t, b"NB;"), b"NB1;".to_vec());
        assert_eq!(reply(&mut t, b"NR;"), b"NR2;".to_vec());
        assert_eq!(reply(&mut t, b"LK2;"), b"?;".to_vec());

        reply(&mut t, b"RC;RD00250;");
        match kenwood::decode_reply(&reply(&mut t, b"IF;")).unwrap() {
            KenwoodCommand::Info(Some(info)) => {
                assert_eq!(info.rit_offset, -250);
                assert!(info.rit_on);
                assert!(!info.xit_on);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_reset_restores_config() {
        let mut t = radio();
        reply(&mut t, b"FA00007000000;PC050;");
        reply(&mut t, b"SR1;");
        assert_eq!(reply(&mut t, b"FA;"), b"FA00014074000;".to_vec());
        assert_eq!(reply(&mut t, b"PC;"), b"PC100;".to_vec());
    }
}
