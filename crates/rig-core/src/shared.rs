//! Thread-safe session handle

use std::sync::{Arc, Mutex};

use rig_protocol::RigError;

use crate::rig::Rig;

/// A [`Rig`] shared between threads
///
/// Every call holds the session lock for its whole duration, so a cache check
/// and the transaction that may follow it are never interleaved with another
/// client's.
#[derive(Clone)]
pub struct SharedRig {
    inner: Arc<Mutex<Rig>>,
}

impl SharedRig {
    pub fn new(rig: Rig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(rig)),
        }
    }

    /// Run `f` with exclusive access to the session
    pub fn with<T>(&self, f: impl FnOnce(&mut Rig) -> Result<T, RigError>) -> Result<T, RigError> {
        let mut rig = self
            .inner
            .lock()
            .map_err(|_| RigError::Internal("rig session lock poisoned".into()))?;
        f(&mut rig)
    }
}
