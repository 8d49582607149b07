//! Backend trait implemented by each rig model

use rig_protocol::caps::{Op, RigCaps};
use rig_protocol::{
    Freq, Func, Level, Mode, Offset, Parm, Ptt, RigError, Split, Value, Vfo, Width,
};

use crate::engine::{Command, RecoveryHook, TransactionEngine};
use crate::port::RigPort;

/// The open port and the engine that drives it
#[derive(Debug)]
pub struct RigIo {
    pub port: RigPort,
    pub engine: TransactionEngine,
}

impl RigIo {
    pub fn new(port: RigPort, engine: TransactionEngine) -> Self {
        Self { port, engine }
    }

    /// Run one command through the engine
    pub fn transact(&mut self, command: &Command) -> Result<Vec<u8>, RigError> {
        self.engine.execute(&mut self.port, command)
    }
}

fn not_available<T>(op: Op) -> Result<T, RigError> {
    Err(RigError::NotAvailable(op.as_str().to_string()))
}

/// Model-specific implementation of the rig operations
///
/// Every operation defaults to [`RigError::NotAvailable`]; a backend overrides
/// the ones listed in its [`RigCaps::ops`]. Arguments have already been
/// validated against the capability table, and `vfo` is never
/// [`Vfo::Current`], `Main` or `Sub`.
#[allow(unused_variables)]
pub trait RigBackend: Send {
    fn caps(&self) -> &'static RigCaps;

    /// Called once the port is open
    fn open(&mut self, io: &mut RigIo) -> Result<(), RigError> {
        Ok(())
    }

    /// Called before the port is closed
    fn close(&mut self, io: &mut RigIo) -> Result<(), RigError> {
        Ok(())
    }

    /// Hook installed in the engine when the session opens
    fn recovery_hook(&self) -> Option<Box<dyn RecoveryHook>> {
        None
    }

    fn get_freq(&mut self, io: &mut RigIo, vfo: Vfo) -> Result<Freq, RigError> {
        not_available(Op::GetFreq)
    }

    fn set_freq(&mut self, io: &mut RigIo, vfo: Vfo, freq: Freq) -> Result<(), RigError> {
        not_available(Op::SetFreq)
    }

    fn get_mode(&mut self, io: &mut RigIo, vfo: Vfo) -> Result<(Mode, Width), RigError> {
        not_available(Op::GetMode)
    }

    /// `width` is never 0; the session substitutes the normal passband
    fn set_mode(
        &mut self,
        io: &mut RigIo,
        vfo: Vfo,
        mode: Mode,
        width: Width,
    ) -> Result<(), RigError> {
        not_available(Op::SetMode)
    }

    fn get_vfo(&mut self, io: &mut RigIo) -> Result<Vfo, RigError> {
        not_available(Op::GetVfo)
    }

    fn set_vfo(&mut self, io: &mut RigIo, vfo: Vfo) -> Result<(), RigError> {
        not_available(Op::SetVfo)
    }

    fn get_ptt(&mut self, io: &mut RigIo, vfo: Vfo) -> Result<Ptt, RigError> {
        not_available(Op::GetPtt)
    }

    fn set_ptt(&mut self, io: &mut RigIo, vfo: Vfo, ptt: Ptt) -> Result<(), RigError> {
        not_available(Op::SetPtt)
    }

    fn get_split_vfo(&mut self, io: &mut RigIo, vfo: Vfo) -> Result<(Split, Vfo), RigError> {
        not_available(Op::GetSplitVfo)
    }

    fn set_split_vfo(
        &mut self,
        io: &mut RigIo,
        vfo: Vfo,
        split: Split,
        tx_vfo: Vfo,
    ) -> Result<(), RigError> {
        not_available(Op::SetSplitVfo)
    }

    /// Transmit frequency while split; the session falls back to the TX VFO
    /// when this is not in [`RigCaps::ops`]
    fn get_split_freq(&mut self, io: &mut RigIo, vfo: Vfo) -> Result<Freq, RigError> {
        not_available(Op::GetSplitFreq)
    }

    fn set_split_freq(&mut self, io: &mut RigIo, vfo: Vfo, freq: Freq) -> Result<(), RigError> {
        not_available(Op::SetSplitFreq)
    }

    fn get_split_mode(&mut self, io: &mut RigIo, vfo: Vfo) -> Result<(Mode, Width), RigError> {
        not_available(Op::GetSplitMode)
    }

    fn set_split_mode(
        &mut self,
        io: &mut RigIo,
        vfo: Vfo,
        mode: Mode,
        width: Width,
    ) -> Result<(), RigError> {
        not_available(Op::SetSplitMode)
    }

    fn get_level(&mut self, io: &mut RigIo, vfo: Vfo, level: Level) -> Result<Value, RigError> {
        not_available(Op::GetLevel)
    }

    fn set_level(
        &mut self,
        io: &mut RigIo,
        vfo: Vfo,
        level: Level,
        value: Value,
    ) -> Result<(), RigError> {
        not_available(Op::SetLevel)
    }

    fn get_func(&mut self, io: &mut RigIo, vfo: Vfo, func: Func) -> Result<bool, RigError> {
        not_available(Op::GetFunc)
    }

    fn set_func(&mut self, io: &mut RigIo, vfo: Vfo, func: Func, on: bool) -> Result<(), RigError> {
        not_available(Op::SetFunc)
    }

    fn get_parm(&mut self, io: &mut RigIo, parm: Parm) -> Result<Value, RigError> {
        not_available(Op::GetParm)
    }

    fn set_parm(&mut self, io: &mut RigIo, parm: Parm, value: Value) -> Result<(), RigError> {
        not_available(Op::SetParm)
    }

    fn get_rit(&mut self, io: &mut RigIo, vfo: Vfo) -> Result<Offset, RigError> {
        not_available(Op::GetRit)
    }

    fn set_rit(&mut self, io: &mut RigIo, vfo: Vfo, offset: Offset) -> Result<(), RigError> {
        not_available(Op::SetRit)
    }

    fn get_xit(&mut self, io: &mut RigIo, vfo: Vfo) -> Result<Offset, RigError> {
        not_available(Op::GetXit)
    }

    fn set_xit(&mut self, io: &mut RigIo, vfo: Vfo, offset: Offset) -> Result<(), RigError> {
        not_available(Op::SetXit)
    }

    fn get_info(&mut self, io: &mut RigIo) -> Result<String, RigError> {
        not_available(Op::GetInfo)
    }

    fn reset(&mut self, io: &mut RigIo) -> Result<(), RigError> {
        not_available(Op::Reset)
    }
}
