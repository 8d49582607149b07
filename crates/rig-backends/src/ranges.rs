//! Helpers for writing capability tables as constants

use rig_protocol::caps::FreqRange;
use rig_protocol::{Freq, Mode, Vfo};

/// Receive-only range
pub(crate) const fn rx_range(
    start: Freq,
    end: Freq,
    modes: &'static [Mode],
    vfos: &'static [Vfo],
    antennas: u8,
) -> FreqRange {
    FreqRange {
        start,
        end,
        modes,
        low_power_mw: None,
        high_power_mw: None,
        vfos,
        antennas,
    }
}

/// Transmit range with power limits in mW
pub(crate) const fn tx_range(
    start: Freq,
    end: Freq,
    modes: &'static [Mode],
    low_mw: u32,
    high_mw: u32,
    vfos: &'static [Vfo],
    antennas: u8,
) -> FreqRange {
    FreqRange {
        start,
        end,
        modes,
        low_power_mw: Some(low_mw),
        high_power_mw: Some(high_mw),
        vfos,
        antennas,
    }
}
