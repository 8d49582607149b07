//! Starting state for emulated radios

use rig_protocol::{Freq, Mode};
use serde::{Deserialize, Serialize};

use crate::device::Faults;

/// Configuration for creating an emulated radio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualRigConfig {
    /// Initial VFO A frequency in Hz
    pub frequency_a_hz: Freq,
    /// Initial VFO B frequency in Hz
    pub frequency_b_hz: Freq,
    /// Initial mode on both VFOs
    pub mode: Mode,
    /// Faults active from the first frame
    pub faults: Faults,
}

impl Default for VirtualRigConfig {
    fn default() -> Self {
        Self {
            frequency_a_hz: 14_074_000, // 20m FT8
            frequency_b_hz: 7_074_000,
            mode: Mode::Usb,
            faults: Faults::default(),
        }
    }
}
