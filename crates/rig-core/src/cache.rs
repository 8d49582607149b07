//! Response cache
//!
//! Values read from or written to the rig are memoized per (kind, VFO) with a
//! per-kind time to live. A fresh entry is served without touching the port; a
//! TTL of zero turns caching off for that kind.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rig_protocol::{Freq, Mode, Ptt, RigError, Split, Vfo, Width};
use tracing::trace;

/// Default time to live for every kind
pub const DEFAULT_TTL: Duration = Duration::from_millis(500);

/// Quantity being cached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Freq,
    Mode,
    Vfo,
    Ptt,
    Split,
}

impl CacheKind {
    pub const ALL: [CacheKind; 5] = [
        CacheKind::Freq,
        CacheKind::Mode,
        CacheKind::Vfo,
        CacheKind::Ptt,
        CacheKind::Split,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CacheKind::Freq => "freq",
            CacheKind::Mode => "mode",
            CacheKind::Vfo => "vfo",
            CacheKind::Ptt => "ptt",
            CacheKind::Split => "split",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which TTLs a `set_timeout` call changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSelector {
    All,
    Kind(CacheKind),
}

impl FromStr for CacheSelector {
    type Err = RigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(CacheSelector::All);
        }
        CacheKind::ALL
            .iter()
            .find(|k| s.eq_ignore_ascii_case(k.name()))
            .map(|k| CacheSelector::Kind(*k))
            .ok_or_else(|| RigError::InvalidParam(format!("unknown cache kind '{}'", s)))
    }
}

/// A cached value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachedValue {
    Freq(Freq),
    Mode(Mode, Width),
    Vfo(Vfo),
    Ptt(Ptt),
    /// Split state and TX VFO
    Split(Split, Vfo),
}

impl CachedValue {
    pub fn kind(&self) -> CacheKind {
        match self {
            CachedValue::Freq(_) => CacheKind::Freq,
            CachedValue::Mode(..) => CacheKind::Mode,
            CachedValue::Vfo(_) => CacheKind::Vfo,
            CachedValue::Ptt(_) => CacheKind::Ptt,
            CachedValue::Split(..) => CacheKind::Split,
        }
    }
}

/// Freshness of one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Empty,
    Fresh,
    Stale,
}

/// Monotonic time source
pub trait Clock: Send {
    fn now(&self) -> Instant;
}

/// [`Instant::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
///
/// Clones share the same time, so a test can keep one and hand the other to
/// the cache.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Hit and miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Per (kind, VFO) memo of rig state
pub struct ResponseCache {
    ttl: [Duration; 5],
    entries: HashMap<(CacheKind, Vfo), (CachedValue, Instant)>,
    clock: Box<dyn Clock>,
    stats: CacheStats,
}

impl fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl ResponseCache {
    /// Cache with the same TTL for every kind
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Box::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Box<dyn Clock>) -> Self {
        Self {
            ttl: [ttl; 5],
            entries: HashMap::new(),
            clock,
            stats: CacheStats::default(),
        }
    }

    pub fn timeout(&self, kind: CacheKind) -> Duration {
        self.ttl[kind.index()]
    }

    /// Change the TTL of one kind or of all of them
    pub fn set_timeout(&mut self, selector: CacheSelector, ttl: Duration) {
        match selector {
            CacheSelector::All => self.ttl = [ttl; 5],
            CacheSelector::Kind(kind) => self.ttl[kind.index()] = ttl,
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn state(&self, kind: CacheKind, vfo: Vfo) -> EntryState {
        match self.entries.get(&(kind, vfo)) {
            None => EntryState::Empty,
            Some((_, stored_at)) if self.is_fresh(kind, *stored_at) => EntryState::Fresh,
            Some(_) => EntryState::Stale,
        }
    }

    /// The entry for (kind, vfo) if it is fresh
    pub fn lookup(&self, kind: CacheKind, vfo: Vfo) -> Option<CachedValue> {
        self.entries
            .get(&(kind, vfo))
            .filter(|(_, stored_at)| self.is_fresh(kind, *stored_at))
            .map(|(value, _)| *value)
    }

    /// Record a value read from or written to the rig
    pub fn store(&mut self, vfo: Vfo, value: CachedValue) {
        let kind = value.kind();
        if self.timeout(kind).is_zero() {
            return;
        }
        let now = self.clock.now();
        self.entries.insert((kind, vfo), (value, now));
    }

    /// Serve a fresh entry, or call `fetch` and store what it returns
    pub fn get_or_fetch<F>(
        &mut self,
        kind: CacheKind,
        vfo: Vfo,
        fetch: F,
    ) -> Result<CachedValue, RigError>
    where
        F: FnOnce() -> Result<CachedValue, RigError>,
    {
        if let Some(value) = self.lookup(kind, vfo) {
            self.stats.hits += 1;
            trace!("Cache hit {} {}: {:?}", kind, vfo, value);
            return Ok(value);
        }
        self.stats.misses += 1;
        let value = fetch()?;
        if value.kind() != kind {
            return Err(RigError::Internal(format!(
                "fetched {:?} for {} cache entry",
                value, kind
            )));
        }
        self.store(vfo, value);
        Ok(value)
    }

    pub fn invalidate(&mut self, kind: CacheKind, vfo: Vfo) {
        self.entries.remove(&(kind, vfo));
    }

    /// Drop every entry of `kind`, whatever its VFO
    pub fn invalidate_kind(&mut self, kind: CacheKind) {
        self.entries.retain(|(k, _), _| *k != kind);
    }

    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    /// Return every entry to [`EntryState::Empty`] and reset the counters
    pub fn clear(&mut self) {
        self.entries.clear();
        self.stats = CacheStats::default();
    }

    fn is_fresh(&self, kind: CacheKind, stored_at: Instant) -> bool {
        let ttl = self.timeout(kind);
        !ttl.is_zero() && self.clock.now().saturating_duration_since(stored_at) < ttl
    }
}
