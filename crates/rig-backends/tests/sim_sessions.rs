//! Sessions against emulated radios
//!
//! These drive each backend through a [`Rig`] over a `rig-sim` transport
//! and check:
//! - Frames reach the radio and state changes land where expected
//! - Retries and the Ten-Tec DSP reset recover from faults
//! - The cache keeps repeated reads off the wire

use rig_backends::{Ft817, TenTec, Ts480};
use rig_core::{CacheKind, Rig, RigBackend, RigError};
use rig_protocol::tentec::TenTecMeter;
use rig_protocol::{Func, Level, Mode, Ptt, Split, Value, Vfo};
use rig_sim::{
    Emulator, SimHandle, SimTransport, VirtualKenwood, VirtualRigConfig, VirtualTenTec,
    VirtualYaesu,
};

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    pub fn open<E: Emulator>(backend: impl RigBackend + 'static, radio: E) -> (Rig, SimHandle<E>) {
        let transport = SimTransport::new(radio);
        let handle = transport.handle();
        let mut rig = Rig::new(Box::new(backend));
        rig.open(Box::new(transport)).unwrap();
        (rig, handle)
    }

    pub fn omni() -> (Rig, SimHandle<VirtualTenTec>) {
        open(
            TenTec::tt588(),
            VirtualTenTec::tt588(&VirtualRigConfig::default()),
        )
    }

    pub fn ts480() -> (Rig, SimHandle<VirtualKenwood>) {
        open(Ts480::new(), VirtualKenwood::new(&VirtualRigConfig::default()))
    }

    pub fn ft817() -> (Rig, SimHandle<VirtualYaesu>) {
        open(Ft817::new(), VirtualYaesu::new(&VirtualRigConfig::default()))
    }
}

use helpers::*;

// ============================================================================
// Ten-Tec
// ============================================================================

#[test]
fn test_tentec_hung_dsp_is_reset() {
    let (mut rig, sim) = omni();
    sim.hang();

    assert_eq!(rig.get_freq(Vfo::A).unwrap(), 14_074_000);

    // four ignored attempts, one reset, one final attempt
    assert_eq!(sim.frames_received(), 6);
    assert_eq!(sim.stats().resets, 1);
    let stats = rig.engine_stats().unwrap();
    assert_eq!(stats.retries, 3);
    assert_eq!(stats.recoveries, 1);
}

#[test]
fn test_tentec_dropped_replies_are_retried() {
    let (mut rig, sim) = omni();
    sim.drop_next(2);
    assert_eq!(rig.get_freq(Vfo::B).unwrap(), 7_074_000);
    assert_eq!(sim.frames_received(), 3);
    assert_eq!(rig.engine_stats().unwrap().recoveries, 0);
}

#[test]
fn test_tentec_mistagged_reply_is_retried() {
    let (mut rig, sim) = omni();
    sim.mistag_next(1);
    assert_eq!(rig.get_freq(Vfo::A).unwrap(), 14_074_000);
    assert_eq!(sim.frames_received(), 2);
}

#[test]
fn test_tentec_mode_and_filter() {
    let (mut rig, sim) = omni();
    rig.set_mode(Vfo::B, Mode::Cw, 500).unwrap();
    sim.with_radio(|r| {
        assert_eq!(r.mode_a, b'1');
        assert_eq!(r.mode_b, b'3');
    });
    rig.invalidate_cache(CacheKind::Mode, Vfo::B).unwrap();
    assert_eq!(rig.get_mode(Vfo::B).unwrap(), (Mode::Cw, 500));
}

#[test]
fn test_tentec_levels() {
    let (mut rig, sim) = omni();
    sim.with_radio(|r| {
        r.set_register(TenTecMeter::Forward, 100);
        r.set_register(TenTecMeter::Reflected, 25);
        r.signal = (9, 20);
    });
    assert_eq!(
        rig.get_level(Vfo::Current, Level::Strength).unwrap(),
        Value::Int(20)
    );
    assert_eq!(
        rig.get_level(Vfo::Current, Level::Swr).unwrap(),
        Value::Float(3.0)
    );
    rig.set_level(Vfo::Current, Level::Rf, Value::Float(1.0))
        .unwrap();
    assert_eq!(sim.with_radio(|r| r.register(TenTecMeter::RfGain)), 0);
}

#[test]
fn test_tentec_info_and_reset() {
    let (mut rig, _sim) = omni();
    assert_eq!(rig.get_info().unwrap(), "VER 1.010");
    rig.reset().unwrap();
}

// ============================================================================
// Kenwood
// ============================================================================

#[test]
fn test_kenwood_cached_reads_stay_off_the_wire() {
    let (mut rig, sim) = ts480();
    let after_open = sim.frames_received();
    assert_eq!(rig.get_freq(Vfo::A).unwrap(), 14_074_000);
    assert_eq!(rig.get_freq(Vfo::A).unwrap(), 14_074_000);
    assert_eq!(sim.frames_received(), after_open + 1);
}

#[test]
fn test_kenwood_mode_on_other_vfo() {
    let (mut rig, sim) = ts480();
    rig.set_mode(Vfo::B, Mode::Lsb, 0).unwrap();
    sim.with_radio(|r| {
        assert_eq!(r.mode, 1);
        assert_eq!(r.rx_vfo, 0);
    });
    assert_eq!(rig.state().vfo, Vfo::A);
}

#[test]
fn test_kenwood_split_and_ptt() {
    let (mut rig, sim) = ts480();
    rig.set_split_vfo(Vfo::A, Split::On, Vfo::B).unwrap();
    rig.set_ptt(Vfo::Current, Ptt::On).unwrap();
    assert!(sim.with_radio(|r| r.transmitting));

    rig.invalidate_cache(CacheKind::Split, Vfo::A).unwrap();
    assert_eq!(rig.get_split_vfo(Vfo::A).unwrap(), (Split::On, Vfo::B));
    rig.invalidate_cache(CacheKind::Ptt, Vfo::A).unwrap();
    assert_eq!(rig.get_ptt(Vfo::A).unwrap(), Ptt::On);
}

#[test]
fn test_kenwood_split_on_other_vfo_follows_radio() {
    let (mut rig, sim) = ts480();
    rig.set_split_vfo(Vfo::B, Split::On, Vfo::A).unwrap();
    sim.with_radio(|r| {
        assert_eq!(r.rx_vfo, 1);
        assert_eq!(r.tx_vfo, 0);
    });
    assert_eq!(rig.state().vfo, Vfo::B);
    assert_eq!(rig.get_split_vfo(Vfo::Current).unwrap(), (Split::On, Vfo::A));
}

#[test]
fn test_kenwood_split_freq_lands_on_tx_vfo() {
    let (mut rig, sim) = ts480();
    rig.set_split_vfo(Vfo::A, Split::On, Vfo::B).unwrap();
    rig.set_split_freq(Vfo::Current, 14_080_000).unwrap();
    sim.with_radio(|r| {
        assert_eq!(r.freq_b, 14_080_000);
        assert_eq!(r.freq_a, 14_074_000);
    });
    assert_eq!(rig.get_split_freq(Vfo::Current).unwrap(), 14_080_000);
}

#[test]
fn test_kenwood_funcs_and_rit() {
    let (mut rig, sim) = ts480();
    rig.set_func(Vfo::Current, Func::Nb, true).unwrap();
    rig.set_func(Vfo::Current, Func::Rit, true).unwrap();
    assert!(rig.get_func(Vfo::Current, Func::Nb).unwrap());
    assert!(!rig.get_func(Vfo::Current, Func::Vox).unwrap());

    rig.set_rit(Vfo::Current, 300).unwrap();
    rig.set_rit(Vfo::Current, -150).unwrap();
    assert_eq!(sim.with_radio(|r| r.rit_offset), -150);
    assert_eq!(rig.get_rit(Vfo::Current).unwrap(), -150);
}

#[test]
fn test_kenwood_info_and_power() {
    let (mut rig, sim) = ts480();
    assert_eq!(rig.get_info().unwrap(), "TS-480 (ID 020)");
    rig.set_level(Vfo::Current, Level::RfPower, Value::Float(0.25))
        .unwrap();
    assert_eq!(sim.with_radio(|r| r.power), 25);
    assert_eq!(
        rig.get_level(Vfo::Current, Level::RfPower).unwrap(),
        Value::Float(0.25)
    );
}

#[test]
fn test_kenwood_silent_radio_times_out() {
    let (mut rig, sim) = ts480();
    let before = sim.frames_received();
    sim.drop_next(10);
    assert_eq!(rig.get_freq(Vfo::B), Err(RigError::Timeout));
    assert_eq!(sim.frames_received(), before + 4);
}

// ============================================================================
// Yaesu
// ============================================================================

#[test]
fn test_yaesu_other_vfo_is_toggled_back() {
    let (mut rig, sim) = ft817();
    assert_eq!(rig.get_freq(Vfo::B).unwrap(), 7_074_000);
    assert_eq!(sim.frames_received(), 3);
    assert_eq!(sim.with_radio(|r| r.vfo), 0);
}

#[test]
fn test_yaesu_set_freq_and_mode() {
    let (mut rig, sim) = ft817();
    rig.set_freq(Vfo::Current, 145_500_000).unwrap();
    rig.set_mode(Vfo::Current, Mode::Fm, 0).unwrap();
    sim.with_radio(|r| {
        assert_eq!(r.freqs[0], 145_500_000);
        assert_eq!(r.modes[0], 0x08);
    });
    assert!(matches!(
        rig.set_freq(Vfo::Current, 80_000_000),
        Err(RigError::OutOfRange(_))
    ));
}

#[test]
fn test_yaesu_ptt_split_and_power() {
    let (mut rig, sim) = ft817();
    rig.set_split_vfo(Vfo::A, Split::On, Vfo::B).unwrap();
    rig.set_ptt(Vfo::Current, Ptt::On).unwrap();
    assert!(sim.with_radio(|r| r.split && r.transmitting));
    rig.invalidate_cache(CacheKind::Ptt, Vfo::A).unwrap();
    assert_eq!(rig.get_ptt(Vfo::A).unwrap(), Ptt::On);
    assert_eq!(
        rig.get_level(Vfo::Current, Level::RfPower).unwrap(),
        Value::Float(1.0)
    );
    assert_eq!(
        rig.get_level(Vfo::Current, Level::Strength).unwrap(),
        Value::Int(0)
    );
}
