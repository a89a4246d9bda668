//! Configuration for a response cache family.

use std::time::Duration;

/// Default time-to-live for cached responses (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default interval between background sweeps (1 minute).
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for one cache family.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Family name (e.g. `search`, `extract`). Used for logging, stats, and
    /// as the scope name for administrative clears.
    pub family: String,

    /// How long an entry stays valid after insertion.
    pub ttl: Duration,

    /// Maximum resident entries. `None` means unbounded; expired entries are
    /// still reclaimed by the sweep.
    pub max_entries: Option<usize>,

    /// Interval for the background sweep task.
    pub sweep_interval: Duration,
}

impl CacheConfig {
    /// Create a configuration for the named family with default values.
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            ttl: DEFAULT_TTL,
            max_entries: None,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Set the TTL for cached entries.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Bound the number of resident entries.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    /// Remove the capacity bound.
    pub fn unbounded(mut self) -> Self {
        self.max_entries = None;
        self
    }

    /// Set the sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}
