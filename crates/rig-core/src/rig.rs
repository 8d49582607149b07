//! Rig session
//!
//! A [`Rig`] ties a backend to an open port, the transaction engine and the
//! response cache. Every operation checks the capability table first, so
//! unsupported operations and out-of-range arguments fail without I/O.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut rig = Rig::new(backend);
//! rig.open(transport)?;
//! rig.set_freq(Vfo::Current, 14_074_000)?;
//! let freq = rig.get_freq(Vfo::Current)?; // served from the cache
//! ```

use std::time::Duration;

use rig_protocol::caps::{Op, RigCaps};
use rig_protocol::{
    Freq, Func, Level, Mode, Offset, Parm, Ptt, RigError, Split, Value, Vfo, Width,
};
use tracing::{debug, info, warn};

use crate::backend::{RigBackend, RigIo};
use crate::cache::{CacheKind, CacheSelector, CacheStats, CachedValue, Clock, ResponseCache};
use crate::config::RigConfig;
use crate::engine::{EngineStats, TransactionEngine};
use crate::port::RigPort;
use crate::transport::Transport;

/// What the session knows about the rig
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    pub vfo: Vfo,
    pub freq: Option<Freq>,
    pub mode: Option<(Mode, Width)>,
    pub split: Split,
    pub tx_vfo: Vfo,
    pub ptt: Ptt,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            vfo: Vfo::A,
            freq: None,
            mode: None,
            split: Split::Off,
            tx_vfo: Vfo::A,
            ptt: Ptt::Off,
        }
    }
}

struct Session {
    caps: &'static RigCaps,
    backend: Box<dyn RigBackend>,
    io: Option<RigIo>,
    state: SessionState,
}

impl Session {
    fn io(&mut self) -> Result<(&mut dyn RigBackend, &mut RigIo), RigError> {
        let io = self.io.as_mut().ok_or(RigError::NotOpen)?;
        Ok((self.backend.as_mut(), io))
    }

    /// Run `f` against `vfo`, switching VFOs around it when the model cannot
    /// address `vfo` directly
    fn on_vfo<T>(
        &mut self,
        op: Op,
        vfo: Vfo,
        f: impl FnOnce(&mut dyn RigBackend, &mut RigIo, Vfo) -> Result<T, RigError>,
    ) -> Result<T, RigError> {
        let current = self.state.vfo;
        let caps = self.caps;
        let (backend, io) = self.io()?;
        if vfo == current || caps.is_targetable(op) {
            return f(backend, io, vfo);
        }
        if !caps.has_op(Op::SetVfo) {
            return Err(RigError::NotTargetable(format!("{} on {}", op, vfo)));
        }
        debug!("Emulating {} on {} by switching from {}", op, vfo, current);
        backend.set_vfo(&mut *io, vfo)?;
        let result = f(&mut *backend, &mut *io, vfo);
        let restore = backend.set_vfo(io, current);
        let value = result?;
        restore?;
        Ok(value)
    }
}

/// An open (or openable) rig
pub struct Rig {
    session: Session,
    cache: ResponseCache,
    config: RigConfig,
}

impl Rig {
    /// Session for `backend`, configured from its capability table
    pub fn new(backend: Box<dyn RigBackend>) -> Self {
        let config = RigConfig::from_caps(backend.caps());
        Self::with_config(backend, config)
    }

    pub fn with_config(backend: Box<dyn RigBackend>, config: RigConfig) -> Self {
        let caps = backend.caps();
        Self {
            session: Session {
                caps,
                backend,
                io: None,
                state: SessionState::default(),
            },
            cache: ResponseCache::new(config.cache_timeout()),
            config,
        }
    }

    /// Replace the cache clock
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.cache = ResponseCache::with_clock(self.config.cache_timeout(), clock);
        self
    }

    pub fn caps(&self) -> &'static RigCaps {
        self.session.caps
    }

    pub fn config(&self) -> RigConfig {
        self.config
    }

    pub fn is_open(&self) -> bool {
        self.session.io.is_some()
    }

    pub fn state(&self) -> SessionState {
        self.session.state
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn engine_stats(&self) -> Option<EngineStats> {
        self.session.io.as_ref().map(|io| io.engine.stats())
    }

    /// Open the session on `transport`
    pub fn open(&mut self, transport: Box<dyn Transport>) -> Result<(), RigError> {
        if self.is_open() {
            return Err(RigError::InvalidParam("rig is already open".into()));
        }
        let caps = self.session.caps;
        let description = transport.description();
        let port = RigPort::new(transport, self.config.timing());
        let mut engine = TransactionEngine::new(self.config.retry);
        engine.set_recovery(self.session.backend.recovery_hook());
        let mut io = RigIo::new(port, engine);

        if let Err(e) = self.session.backend.open(&mut io) {
            warn!("Failed to open {} on {}: {}", caps.model_name, description, e);
            let _ = io.port.close();
            return Err(e);
        }

        self.session.state = SessionState::default();
        if caps.has_op(Op::GetVfo) {
            match self.session.backend.get_vfo(&mut io) {
                Ok(vfo) => self.session.state.vfo = vfo.canonical(),
                Err(e) => warn!("Failed to read current VFO, assuming {}: {}", Vfo::A, e),
            }
        }
        self.session.io = Some(io);
        info!(
            "Opened {} {} on {}",
            caps.manufacturer, caps.model_name, description
        );
        Ok(())
    }

    /// Close the session and forget everything cached
    pub fn close(&mut self) -> Result<(), RigError> {
        let Some(mut io) = self.session.io.take() else {
            return Err(RigError::NotOpen);
        };
        let backend_result = self.session.backend.close(&mut io);
        if let Err(ref e) = backend_result {
            warn!("Backend close failed: {}", e);
        }
        let stats = io.engine.stats();
        let port_result = io.port.close();
        self.cache.clear();
        self.session.state = SessionState::default();
        info!(
            "Closed {} ({} transactions, {} retries, {} recoveries, {} failures)",
            self.session.caps.model_name,
            stats.transactions,
            stats.retries,
            stats.recoveries,
            stats.failures
        );
        backend_result.and(port_result)
    }

    /// Map `Current` to the session VFO and fold Main/Sub onto A/B
    fn resolve(&self, vfo: Vfo) -> Result<Vfo, RigError> {
        if !self.session.caps.supports_vfo(vfo) {
            return Err(RigError::InvalidParam(format!(
                "{} not supported by {}",
                vfo, self.session.caps.model_name
            )));
        }
        Ok(match vfo {
            Vfo::Current => self.session.state.vfo,
            other => other.canonical(),
        })
    }

    pub fn get_freq(&mut self, vfo: Vfo) -> Result<Freq, RigError> {
        self.session.caps.require(Op::GetFreq)?;
        let vfo = self.resolve(vfo)?;
        let session = &mut self.session;
        let value = self.cache.get_or_fetch(CacheKind::Freq, vfo, || {
            session
                .on_vfo(Op::GetFreq, vfo, |b, io, v| b.get_freq(io, v))
                .map(CachedValue::Freq)
        })?;
        match value {
            CachedValue::Freq(freq) => {
                if vfo == session.state.vfo {
                    session.state.freq = Some(freq);
                }
                Ok(freq)
            }
            other => Err(mismatch(CacheKind::Freq, other)),
        }
    }

    pub fn set_freq(&mut self, vfo: Vfo, freq: Freq) -> Result<(), RigError> {
        let caps = self.session.caps;
        caps.require(Op::SetFreq)?;
        let vfo = self.resolve(vfo)?;
        if !caps.freq_in_range(freq) {
            return Err(RigError::OutOfRange(format!(
                "{} Hz outside the ranges of {}",
                freq, caps.model_name
            )));
        }
        self.session
            .on_vfo(Op::SetFreq, vfo, |b, io, v| b.set_freq(io, v, freq))?;
        self.cache.store(vfo, CachedValue::Freq(freq));
        if vfo == self.session.state.vfo {
            self.session.state.freq = Some(freq);
        }
        Ok(())
    }

    /// Mode and passband width
    pub fn get_mode(&mut self, vfo: Vfo) -> Result<(Mode, Width), RigError> {
        self.session.caps.require(Op::GetMode)?;
        let vfo = self.resolve(vfo)?;
        let session = &mut self.session;
        let value = self.cache.get_or_fetch(CacheKind::Mode, vfo, || {
            session
                .on_vfo(Op::GetMode, vfo, |b, io, v| b.get_mode(io, v))
                .map(|(m, w)| CachedValue::Mode(m, w))
        })?;
        match value {
            CachedValue::Mode(mode, width) => {
                if vfo == session.state.vfo {
                    session.state.mode = Some((mode, width));
                }
                Ok((mode, width))
            }
            other => Err(mismatch(CacheKind::Mode, other)),
        }
    }

    /// Set mode and passband; a width of 0 selects the normal passband
    pub fn set_mode(&mut self, vfo: Vfo, mode: Mode, width: Width) -> Result<(), RigError> {
        let caps = self.session.caps;
        caps.require(Op::SetMode)?;
        let vfo = self.resolve(vfo)?;
        if !caps.supports_mode(mode) {
            return Err(RigError::InvalidParam(format!(
                "{} not supported by {}",
                mode, caps.model_name
            )));
        }
        let width = match width {
            0 => caps.passband_normal(mode).unwrap_or(0),
            w => w,
        };
        self.session
            .on_vfo(Op::SetMode, vfo, |b, io, v| b.set_mode(io, v, mode, width))?;
        self.cache.store(vfo, CachedValue::Mode(mode, width));
        if vfo == self.session.state.vfo {
            self.session.state.mode = Some((mode, width));
        }
        Ok(())
    }

    pub fn get_vfo(&mut self) -> Result<Vfo, RigError> {
        self.session.caps.require(Op::GetVfo)?;
        let session = &mut self.session;
        let value = self.cache.get_or_fetch(CacheKind::Vfo, Vfo::Current, || {
            let (backend, io) = session.io()?;
            backend.get_vfo(io).map(|v| CachedValue::Vfo(v.canonical()))
        })?;
        match value {
            CachedValue::Vfo(vfo) => {
                session.state.vfo = vfo;
                Ok(vfo)
            }
            other => Err(mismatch(CacheKind::Vfo, other)),
        }
    }

    pub fn set_vfo(&mut self, vfo: Vfo) -> Result<(), RigError> {
        self.session.caps.require(Op::SetVfo)?;
        let vfo = self.resolve(vfo)?;
        let (backend, io) = self.session.io()?;
        backend.set_vfo(io, vfo)?;
        self.session.state.vfo = vfo;
        self.session.state.freq = None;
        self.session.state.mode = None;
        self.cache.store(Vfo::Current, CachedValue::Vfo(vfo));
        Ok(())
    }

    pub fn get_ptt(&mut self, vfo: Vfo) -> Result<Ptt, RigError> {
        self.session.caps.require(Op::GetPtt)?;
        let vfo = self.resolve(vfo)?;
        let session = &mut self.session;
        let value = self.cache.get_or_fetch(CacheKind::Ptt, vfo, || {
            let (backend, io) = session.io()?;
            backend.get_ptt(io, vfo).map(CachedValue::Ptt)
        })?;
        match value {
            CachedValue::Ptt(ptt) => {
                session.state.ptt = ptt;
                Ok(ptt)
            }
            other => Err(mismatch(CacheKind::Ptt, other)),
        }
    }

    pub fn set_ptt(&mut self, vfo: Vfo, ptt: Ptt) -> Result<(), RigError> {
        self.session.caps.require(Op::SetPtt)?;
        let vfo = self.resolve(vfo)?;
        let (backend, io) = self.session.io()?;
        backend.set_ptt(io, vfo, ptt)?;
        self.session.state.ptt = ptt;
        self.cache.store(vfo, CachedValue::Ptt(ptt));
        Ok(())
    }

    /// Split state and TX VFO
    pub fn get_split_vfo(&mut self, vfo: Vfo) -> Result<(Split, Vfo), RigError> {
        self.session.caps.require(Op::GetSplitVfo)?;
        let vfo = self.resolve(vfo)?;
        let session = &mut self.session;
        let value = self.cache.get_or_fetch(CacheKind::Split, vfo, || {
            let (backend, io) = session.io()?;
            backend
                .get_split_vfo(io, vfo)
                .map(|(s, tx)| CachedValue::Split(s, tx.canonical()))
        })?;
        match value {
            CachedValue::Split(split, tx_vfo) => {
                session.state.split = split;
                session.state.tx_vfo = tx_vfo;
                Ok((split, tx_vfo))
            }
            other => Err(mismatch(CacheKind::Split, other)),
        }
    }

    pub fn set_split_vfo(&mut self, vfo: Vfo, split: Split, tx_vfo: Vfo) -> Result<(), RigError> {
        self.session.caps.require(Op::SetSplitVfo)?;
        let vfo = self.resolve(vfo)?;
        let tx_vfo = self.resolve(tx_vfo)?;
        let (backend, io) = self.session.io()?;
        backend.set_split_vfo(io, vfo, split, tx_vfo)?;
        self.session.state.split = split;
        self.session.state.tx_vfo = tx_vfo;
        // Split is rig wide, so entries read through other VFOs are stale
        self.cache.invalidate_kind(CacheKind::Split);
        self.cache.store(vfo, CachedValue::Split(split, tx_vfo));
        if vfo != self.session.state.vfo {
            self.resync_vfo();
        }
        Ok(())
    }

    /// Re-read the current VFO after an operation that may have moved it
    fn resync_vfo(&mut self) {
        self.cache.invalidate(CacheKind::Vfo, Vfo::Current);
        if !self.session.caps.has_op(Op::GetVfo) {
            return;
        }
        if let Err(e) = self.get_vfo() {
            warn!("Failed to re-read current VFO: {}", e);
        }
    }

    /// VFO that transmits while split, for rigs without split commands
    fn split_tx_vfo(&mut self, vfo: Vfo) -> Result<Vfo, RigError> {
        let rx = self.resolve(vfo)?;
        let (split, tx) = if self.session.caps.has_op(Op::GetSplitVfo) {
            self.get_split_vfo(rx)?
        } else {
            (self.session.state.split, self.session.state.tx_vfo)
        };
        if split.is_on() && tx != rx {
            return Ok(tx);
        }
        rx.other()
            .ok_or_else(|| RigError::NotTargetable(format!("no TX VFO paired with {}", rx)))
    }

    /// Transmit frequency used while split
    pub fn get_split_freq(&mut self, vfo: Vfo) -> Result<Freq, RigError> {
        let caps = self.session.caps;
        if caps.has_op(Op::GetSplitFreq) {
            let vfo = self.resolve(vfo)?;
            let (backend, io) = self.session.io()?;
            return backend.get_split_freq(io, vfo);
        }
        caps.require(Op::GetFreq)?;
        let tx = self.split_tx_vfo(vfo)?;
        self.get_freq(tx)
    }

    pub fn set_split_freq(&mut self, vfo: Vfo, freq: Freq) -> Result<(), RigError> {
        let caps = self.session.caps;
        if !caps.has_op(Op::SetSplitFreq) {
            caps.require(Op::SetFreq)?;
            let tx = self.split_tx_vfo(vfo)?;
            return self.set_freq(tx, freq);
        }
        let vfo = self.resolve(vfo)?;
        if !caps.freq_in_range(freq) {
            return Err(RigError::OutOfRange(format!(
                "{} Hz outside the ranges of {}",
                freq, caps.model_name
            )));
        }
        let (backend, io) = self.session.io()?;
        backend.set_split_freq(io, vfo, freq)?;
        // The TX VFO may be cached under its own key
        self.cache.invalidate_kind(CacheKind::Freq);
        Ok(())
    }

    /// Transmit mode and passband used while split
    pub fn get_split_mode(&mut self, vfo: Vfo) -> Result<(Mode, Width), RigError> {
        let caps = self.session.caps;
        if caps.has_op(Op::GetSplitMode) {
            let vfo = self.resolve(vfo)?;
            let (backend, io) = self.session.io()?;
            return backend.get_split_mode(io, vfo);
        }
        caps.require(Op::GetMode)?;
        let tx = self.split_tx_vfo(vfo)?;
        self.get_mode(tx)
    }

    pub fn set_split_mode(&mut self, vfo: Vfo, mode: Mode, width: Width) -> Result<(), RigError> {
        let caps = self.session.caps;
        if !caps.has_op(Op::SetSplitMode) {
            caps.require(Op::SetMode)?;
            let tx = self.split_tx_vfo(vfo)?;
            return self.set_mode(tx, mode, width);
        }
        let vfo = self.resolve(vfo)?;
        if !caps.supports_mode(mode) {
            return Err(RigError::InvalidParam(format!(
                "{} not supported by {}",
                mode, caps.model_name
            )));
        }
        let width = match width {
            0 => caps.passband_normal(mode).unwrap_or(0),
            w => w,
        };
        let (backend, io) = self.session.io()?;
        backend.set_split_mode(io, vfo, mode, width)?;
        self.cache.invalidate_kind(CacheKind::Mode);
        Ok(())
    }

    pub fn get_level(&mut self, vfo: Vfo, level: Level) -> Result<Value, RigError> {
        let caps = self.session.caps;
        caps.require(Op::GetLevel)?;
        if !caps.can_get_level(level) {
            return Err(RigError::NotAvailable(format!("get_level {}", level)));
        }
        let vfo = self.resolve(vfo)?;
        let (backend, io) = self.session.io()?;
        backend.get_level(io, vfo, level)
    }

    pub fn set_level(&mut self, vfo: Vfo, level: Level, value: Value) -> Result<(), RigError> {
        let caps = self.session.caps;
        caps.require(Op::SetLevel)?;
        caps.check_level(level, value)?;
        let vfo = self.resolve(vfo)?;
        let (backend, io) = self.session.io()?;
        backend.set_level(io, vfo, level, value)
    }

    pub fn get_func(&mut self, vfo: Vfo, func: Func) -> Result<bool, RigError> {
        let caps = self.session.caps;
        caps.require(Op::GetFunc)?;
        if !caps.can_get_func(func) {
            return Err(RigError::NotAvailable(format!("get_func {}", func)));
        }
        let vfo = self.resolve(vfo)?;
        let (backend, io) = self.session.io()?;
        backend.get_func(io, vfo, func)
    }

    pub fn set_func(&mut self, vfo: Vfo, func: Func, on: bool) -> Result<(), RigError> {
        let caps = self.session.caps;
        caps.require(Op::SetFunc)?;
        if !caps.can_set_func(func) {
            return Err(RigError::NotAvailable(format!("set_func {}", func)));
        }
        let vfo = self.resolve(vfo)?;
        let (backend, io) = self.session.io()?;
        backend.set_func(io, vfo, func, on)
    }

    pub fn get_parm(&mut self, parm: Parm) -> Result<Value, RigError> {
        let caps = self.session.caps;
        caps.require(Op::GetParm)?;
        if !caps.can_get_parm(parm) {
            return Err(RigError::NotAvailable(format!("get_parm {}", parm)));
        }
        let (backend, io) = self.session.io()?;
        backend.get_parm(io, parm)
    }

    pub fn set_parm(&mut self, parm: Parm, value: Value) -> Result<(), RigError> {
        let caps = self.session.caps;
        caps.require(Op::SetParm)?;
        caps.check_parm(parm, value)?;
        let (backend, io) = self.session.io()?;
        backend.set_parm(io, parm, value)
    }

    pub fn get_rit(&mut self, vfo: Vfo) -> Result<Offset, RigError> {
        self.session.caps.require(Op::GetRit)?;
        let vfo = self.resolve(vfo)?;
        let (backend, io) = self.session.io()?;
        backend.get_rit(io, vfo)
    }

    /// Set the receive offset; 0 clears it
    pub fn set_rit(&mut self, vfo: Vfo, offset: Offset) -> Result<(), RigError> {
        let caps = self.session.caps;
        caps.require(Op::SetRit)?;
        caps.check_offset(Op::SetRit, offset)?;
        let vfo = self.resolve(vfo)?;
        let (backend, io) = self.session.io()?;
        backend.set_rit(io, vfo, offset)
    }

    pub fn get_xit(&mut self, vfo: Vfo) -> Result<Offset, RigError> {
        self.session.caps.require(Op::GetXit)?;
        let vfo = self.resolve(vfo)?;
        let (backend, io) = self.session.io()?;
        backend.get_xit(io, vfo)
    }

    /// Set the transmit offset; 0 clears it
    pub fn set_xit(&mut self, vfo: Vfo, offset: Offset) -> Result<(), RigError> {
        let caps = self.session.caps;
        caps.require(Op::SetXit)?;
        caps.check_offset(Op::SetXit, offset)?;
        let vfo = self.resolve(vfo)?;
        let (backend, io) = self.session.io()?;
        backend.set_xit(io, vfo, offset)
    }

    /// Free-form identification string from the rig
    pub fn get_info(&mut self) -> Result<String, RigError> {
        self.session.caps.require(Op::GetInfo)?;
        let (backend, io) = self.session.io()?;
        backend.get_info(io)
    }

    /// Reset the rig; everything cached is dropped
    pub fn reset(&mut self) -> Result<(), RigError> {
        self.session.caps.require(Op::Reset)?;
        let (backend, io) = self.session.io()?;
        let result = backend.reset(io);
        self.cache.invalidate_all();
        result
    }

    pub fn cache_timeout(&self, kind: CacheKind) -> Duration {
        self.cache.timeout(kind)
    }

    pub fn set_cache_timeout(&mut self, selector: CacheSelector, ttl: Duration) {
        debug!("Cache timeout for {:?} set to {:?}", selector, ttl);
        self.cache.set_timeout(selector, ttl);
    }

    /// Drop cached values the rig may have changed on its own
    pub fn invalidate_cache(&mut self, kind: CacheKind, vfo: Vfo) -> Result<(), RigError> {
        let vfo = match kind {
            CacheKind::Vfo => Vfo::Current,
            _ => self.resolve(vfo)?,
        };
        self.cache.invalidate(kind, vfo);
        Ok(())
    }

    /// Set a configuration token; takes effect immediately on an open session
    pub fn set_conf(&mut self, token: &str, value: &str) -> Result<(), RigError> {
        self.config.set(token, value)?;
        if token == "cache_timeout" {
            self.cache
                .set_timeout(CacheSelector::All, self.config.cache_timeout());
        }
        if let Some(io) = self.session.io.as_mut() {
            io.port.set_timing(self.config.timing());
            io.engine.set_retry(self.config.retry);
        }
        Ok(())
    }

    pub fn get_conf(&self, token: &str) -> Result<String, RigError> {
        self.config.get(token)
    }
}

impl Drop for Rig {
    fn drop(&mut self) {
        if self.is_open() {
            if let Err(e) = self.close() {
                warn!("Failed to close rig: {}", e);
            }
        }
    }
}

fn mismatch(kind: CacheKind, value: CachedValue) -> RigError {
    RigError::Internal(format!("{} entry holds {:?}", kind, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use rig_protocol::caps::{
        FilterSpec, FreqRange, FuncSet, ParmSet, PortCaps, RigStatus, RigType, Targetable,
    };

    const MODES: &[Mode] = &[Mode::Usb, Mode::Lsb, Mode::Cw];
    const VFOS: &[Vfo] = &[Vfo::A, Vfo::B];
    const RX: &[FreqRange] = &[FreqRange {
        start: 1_000_000,
        end: 30_000_000,
        modes: MODES,
        low_power_mw: None,
        high_power_mw: None,
        vfos: VFOS,
        antennas: 1,
    }];

    const CAPS: RigCaps = RigCaps {
        model: 9998,
        model_name: "Echo",
        manufacturer: "Test",
        version: "0.1",
        status: RigStatus::Alpha,
        rig_type: RigType::Transceiver,
        port: PortCaps::NONE,
        ops: &[Op::GetFreq, Op::SetFreq, Op::SetVfo, Op::SetMode],
        targetable: Targetable {
            freq: false,
            mode: false,
        },
        modes: MODES,
        vfos: VFOS,
        get_levels: &[],
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
        rx_ranges: RX,
        tx_ranges: &[],
        tuning_steps: &[],
        filters: &[FilterSpec {
            modes: MODES,
            width: 2400,
        }],
        channels: &[],
    };

    /// Backend speaking a toy protocol: "F?" / "F=<hz>" / "V<a|b>" / "M<mode>,<w>"
    struct Echo;

    impl RigBackend for Echo {
        fn caps(&self) -> &'static RigCaps {
            &CAPS
        }

        fn get_freq(&mut self, io: &mut RigIo, _vfo: Vfo) -> Result<Freq, RigError> {
            let reply = io.transact(
                &crate::engine::Command::terminated(b"F?\n".to_vec(), b"\n", 32).tag(b"F"),
            )?;
            let text = String::from_utf8_lossy(&reply[1..]).trim().to_string();
            text.parse()
                .map_err(|_| RigError::Protocol(format!("bad frequency '{}'", text)))
        }

        fn set_freq(&mut self, io: &mut RigIo, _vfo: Vfo, freq: Freq) -> Result<(), RigError> {
            io.transact(&crate::engine::Command::write_only(
                format!("F={}\n", freq).into_bytes(),
            ))?;
            Ok(())
        }

        fn set_vfo(&mut self, io: &mut RigIo, vfo: Vfo) -> Result<(), RigError> {
            let c = if vfo == Vfo::B { b'b' } else { b'a' };
            io.transact(&crate::engine::Command::write_only(vec![b'V', c, b'\n']))?;
            Ok(())
        }

        fn set_mode(
            &mut self,
            io: &mut RigIo,
            _vfo: Vfo,
            mode: Mode,
            width: Width,
        ) -> Result<(), RigError> {
            io.transact(&crate::engine::Command::write_only(
                format!("M{},{}\n", mode, width).into_bytes(),
            ))?;
            Ok(())
        }
    }

    fn open(mock: MockTransport) -> Rig {
        let mut rig = Rig::new(Box::new(Echo));
        rig.set_conf("timeout", "5").unwrap();
        rig.open(Box::new(mock)).unwrap();
        rig
    }

    #[test]
    fn test_not_open() {
        let mut rig = Rig::new(Box::new(Echo));
        assert_eq!(rig.get_freq(Vfo::Current), Err(RigError::NotOpen));
        assert_eq!(rig.close(), Err(RigError::NotOpen));
    }

    #[test]
    fn test_unlisted_op_not_available() {
        let mut rig = open(MockTransport::silent());
        assert!(matches!(rig.get_ptt(Vfo::Current), Err(RigError::NotAvailable(_))));
        assert!(matches!(rig.get_info(), Err(RigError::NotAvailable(_))));
    }

    #[test]
    fn test_out_of_range_freq_not_sent() {
        let mock = MockTransport::silent();
        let handle = mock.handle();
        let mut rig = open(mock);
        assert!(matches!(
            rig.set_freq(Vfo::Current, 144_000_000),
            Err(RigError::OutOfRange(_))
        ));
        assert_eq!(handle.write_count(), 0);
    }

    #[test]
    fn test_unsupported_vfo_rejected() {
        let mut rig = open(MockTransport::silent());
        assert!(matches!(
            rig.get_freq(Vfo::C),
            Err(RigError::InvalidParam(_))
        ));
    }

    #[test]
    fn test_write_through() {
        let mut mock = MockTransport::new();
        mock.expect_silence(b"F=14075000\n");
        let handle = mock.handle();
        let mut rig = open(mock);
        rig.set_freq(Vfo::Current, 14_075_000).unwrap();
        assert_eq!(rig.get_freq(Vfo::Current).unwrap(), 14_075_000);
        assert_eq!(handle.write_count(), 1);
        assert_eq!(rig.state().freq, Some(14_075_000));
    }

    #[test]
    fn test_vfo_emulation_switches_and_restores() {
        let mut mock = MockTransport::new();
        mock.expect_silence(b"Vb\n");
        mock.expect(b"F?\n", b"F7074000\n");
        mock.expect_silence(b"Va\n");
        let handle = mock.handle();
        let mut rig = open(mock);
        assert_eq!(rig.get_freq(Vfo::B).unwrap(), 7_074_000);
        assert_eq!(handle.remaining(), 0);
        assert_eq!(rig.state().vfo, Vfo::A);
    }

    #[test]
    fn test_split_freq_falls_back_to_other_vfo() {
        let mut mock = MockTransport::new();
        mock.expect_silence(b"Vb\n");
        mock.expect_silence(b"F=7000000\n");
        mock.expect_silence(b"Va\n");
        let handle = mock.handle();
        let mut rig = open(mock);
        rig.set_split_freq(Vfo::Current, 7_000_000).unwrap();
        assert_eq!(rig.get_split_freq(Vfo::Current).unwrap(), 7_000_000);
        assert_eq!(handle.write_count(), 3);
        assert_eq!(rig.state().vfo, Vfo::A);
    }

    #[test]
    fn test_func_parm_and_offsets_need_caps() {
        let mut rig = open(MockTransport::silent());
        assert!(matches!(
            rig.get_func(Vfo::Current, Func::Nb),
            Err(RigError::NotAvailable(_))
        ));
        assert!(matches!(
            rig.set_parm(Parm::Beep, Value::Int(1)),
            Err(RigError::NotAvailable(_))
        ));
        assert!(matches!(
            rig.set_rit(Vfo::Current, 100),
            Err(RigError::NotAvailable(_))
        ));
    }

    #[test]
    fn test_set_mode_normal_width() {
        let mut mock = MockTransport::new();
        mock.expect_silence(b"MUSB,2400\n");
        let handle = mock.handle();
        let mut rig = open(mock);
        rig.set_mode(Vfo::Current, Mode::Usb, 0).unwrap();
        assert_eq!(handle.remaining(), 0);
        assert!(matches!(
            rig.set_mode(Vfo::Current, Mode::Fm, 0),
            Err(RigError::InvalidParam(_))
        ));
    }

    #[test]
    fn test_close_clears_cache() {
        let mut mock = MockTransport::new();
        mock.expect_silence(b"F=14075000\n");
        let handle = mock.handle();
        let mut rig = open(mock);
        rig.set_freq(Vfo::Current, 14_075_000).unwrap();
        rig.close().unwrap();
        assert!(handle.is_closed());
        assert!(!rig.is_open());
        assert_eq!(
            rig.cache.state(CacheKind::Freq, Vfo::A),
            crate::cache::EntryState::Empty
        );
    }

    #[test]
    fn test_conf_applies_to_open_session() {
        let mut rig = open(MockTransport::silent());
        rig.set_conf("retry", "7").unwrap();
        assert_eq!(rig.get_conf("retry").unwrap(), "7");
        rig.set_conf("cache_timeout", "0").unwrap();
        assert_eq!(rig.cache_timeout(CacheKind::Freq), Duration::ZERO);
        assert!(matches!(
            rig.set_conf("bogus", "1"),
            Err(RigError::Config(_))
        ));
    }
}
