//! Model registry
//!
//! Maps model numbers to capability tables and backend constructors. The
//! command line builds one registry at startup and passes it down.

use std::collections::BTreeMap;

use rig_core::RigBackend;
use rig_protocol::{RigCaps, RigError};

use crate::dummy::{Dummy, DUMMY_CAPS};
use crate::kenwood::{Ts480, TS480_CAPS};
use crate::tentec::{TenTec, TT538_CAPS, TT588_CAPS};
use crate::yaesu::{Ft817, FT817_CAPS};

/// A registered model
#[derive(Clone, Copy)]
pub struct ModelEntry {
    pub caps: &'static RigCaps,
    pub factory: fn() -> Box<dyn RigBackend>,
}

impl ModelEntry {
    /// Fresh backend instance for a new session
    pub fn create(&self) -> Box<dyn RigBackend> {
        (self.factory)()
    }
}

impl std::fmt::Debug for ModelEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelEntry")
            .field("model", &self.caps.model)
            .field("name", &self.caps.model_name)
            .finish()
    }
}

/// Models known to this build, ordered by model number
#[derive(Debug, Default, Clone)]
pub struct ModelRegistry {
    models: BTreeMap<u32, ModelEntry>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in backend
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(&DUMMY_CAPS, || Box::new(Dummy::new()));
        registry.register(&FT817_CAPS, || Box::new(Ft817::new()));
        registry.register(&TS480_CAPS, || Box::new(Ts480::new()));
        registry.register(&TT538_CAPS, || Box::new(TenTec::tt538()));
        registry.register(&TT588_CAPS, || Box::new(TenTec::tt588()));
        registry
    }

    /// Add a model, replacing any entry with the same number
    pub fn register(&mut self, caps: &'static RigCaps, factory: fn() -> Box<dyn RigBackend>) {
        self.models.insert(caps.model, ModelEntry { caps, factory });
    }

    pub fn get(&self, model: u32) -> Result<&ModelEntry, RigError> {
        self.models
            .get(&model)
            .ok_or_else(|| RigError::InvalidParam(format!("unknown rig model {}", model)))
    }

    /// Case-insensitive lookup by model name, e.g. `ts-480`
    pub fn find_by_name(&self, name: &str) -> Option<&ModelEntry> {
        self.models
            .values()
            .find(|e| e.caps.model_name.eq_ignore_ascii_case(name))
    }

    pub fn list(&self) -> impl Iterator<Item = &ModelEntry> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
