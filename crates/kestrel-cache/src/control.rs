//! Type-erased administrative access to cache families.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::cache::{CacheStats, ResponseCache};
use crate::error::{Error, Result};

/// Administrative operations shared by every cache family, independent of
/// the value type each one stores.
pub trait CacheControl: Send + Sync {
    /// Family name.
    fn family(&self) -> &str;

    /// Remove every entry, returning how many were removed.
    fn clear(&self) -> usize;

    /// Current statistics.
    fn stats(&self) -> CacheStats;

    /// Remove expired entries, returning how many were removed.
    fn sweep_expired(&self) -> usize;

    /// Interval at which the background sweep should run.
    fn sweep_interval(&self) -> std::time::Duration;
}

impl<V> CacheControl for ResponseCache<V>
where
    V: Clone + Serialize + Send + 'static,
{
    fn family(&self) -> &str {
        ResponseCache::family(self)
    }

    fn clear(&self) -> usize {
        ResponseCache::clear(self)
    }

    fn stats(&self) -> CacheStats {
        ResponseCache::stats(self)
    }

    fn sweep_expired(&self) -> usize {
        ResponseCache::sweep_expired(self)
    }

    fn sweep_interval(&self) -> std::time::Duration {
        self.config().sweep_interval
    }
}

/// The named cache families of one process, ordered by name.
#[derive(Clone, Default)]
pub struct CacheSet {
    families: BTreeMap<String, Arc<dyn CacheControl>>,
}

impl CacheSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a family. Family names must be unique.
    pub fn insert(&mut self, cache: Arc<dyn CacheControl>) -> Result<()> {
        let family = cache.family().to_string();
        if self.families.contains_key(&family) {
            return Err(Error::DuplicateFamily(family));
        }
        self.families.insert(family, cache);
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, cache: Arc<dyn CacheControl>) -> Result<Self> {
        self.insert(cache)?;
        Ok(self)
    }

    /// Look up a family by name.
    pub fn get(&self, family: &str) -> Result<&Arc<dyn CacheControl>> {
        self.families
            .get(family)
            .ok_or_else(|| Error::UnknownFamily(family.to_string()))
    }

    /// Whether a family with this name exists.
    pub fn contains(&self, family: &str) -> bool {
        self.families.contains_key(family)
    }

    /// Family names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.families.keys().map(|s| s.as_str()).collect()
    }

    /// Iterate families in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn CacheControl>> {
        self.families.values()
    }

    /// Number of families.
    pub fn len(&self) -> usize {
        self.families.len()
    }

    /// Whether the set has no families.
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Statistics for every family, in name order.
    pub fn stats(&self) -> Vec<CacheStats> {
        self.families.values().map(|c| c.stats()).collect()
    }
}

impl std::fmt::Debug for CacheSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheSet")
            .field("families", &self.names())
            .finish()
    }
}
