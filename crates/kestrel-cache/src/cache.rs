//! TTL response cache with insertion-ordered capacity eviction.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::config::CacheConfig;
use crate::key::{CacheKey, KeyPolicy};
use crate::ttl::{Freshness, TtlPolicy};

/// Entry stored in the cache.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Cached value.
    pub value: V,

    /// When this entry was inserted. The TTL window is measured from here.
    pub inserted_at: Instant,

    /// Serialized size of the value, used for memory estimates.
    pub size_bytes: usize,
}

impl<V: Serialize> CacheEntry<V> {
    /// Create a new entry stamped with the current time.
    pub fn new(value: V) -> Self {
        let size_bytes = serde_json::to_vec(&value).map(|b| b.len()).unwrap_or(0);
        Self {
            value,
            inserted_at: Instant::now(),
            size_bytes,
        }
    }
}

/// Inner state protected by the mutex.
///
/// Reads only `peek`, so the LRU order of the map is insertion order and
/// `pop_lru` always yields the oldest-inserted entry.
struct CacheInner<V> {
    entries: LruCache<CacheKey, CacheEntry<V>>,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Response cache for one family.
///
/// Cloning is cheap and yields a handle to the same underlying map. The map
/// is only locked for short synchronous sections; no lock is ever held
/// across an `.await`.
pub struct ResponseCache<V> {
    inner: Arc<Mutex<CacheInner<V>>>,
    config: CacheConfig,
    ttl: TtlPolicy,
    keys: KeyPolicy,
    counters: Arc<Counters>,
}

impl<V> ResponseCache<V>
where
    V: Clone + Serialize,
{
    /// Create a cache that case-folds every string parameter.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_key_policy(config, KeyPolicy::new())
    }

    /// Create a cache with a custom key policy.
    pub fn with_key_policy(config: CacheConfig, keys: KeyPolicy) -> Self {
        let inner = CacheInner {
            entries: LruCache::unbounded(),
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
            ttl: TtlPolicy::new(config.ttl),
            config,
            keys,
            counters: Arc::new(Counters::default()),
        }
    }

    /// The cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The family name.
    pub fn family(&self) -> &str {
        &self.config.family
    }

    /// The configured TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl.ttl()
    }

    /// Current number of resident entries, including expired ones not yet
    /// reclaimed.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Derive the key for a parameter set.
    pub fn key(&self, params: &Value) -> CacheKey {
        self.keys.key(params)
    }

    /// Look up a parameter set.
    pub fn get(&self, params: &Value) -> Option<V> {
        let key = self.key(params);
        self.get_by_key(&key)
    }

    /// Look up by precomputed key.
    ///
    /// An entry at or past its TTL is removed and reported as a miss.
    pub fn get_by_key(&self, key: &CacheKey) -> Option<V> {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        let freshness = inner
            .entries
            .peek(key)
            .map(|entry| self.ttl.classify(entry.inserted_at, now));

        let value = match freshness {
            Some(Freshness::Valid) => inner.entries.peek(key).map(|e| e.value.clone()),
            Some(Freshness::Expired) => {
                inner.entries.pop(key);
                debug!(family = %self.config.family, key = %key, "Expired entry removed on read");
                None
            }
            None => None,
        };

        if value.is_some() {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            trace!(family = %self.config.family, key = %key, "Cache hit");
        } else {
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            trace!(family = %self.config.family, key = %key, "Cache miss");
        }

        value
    }

    /// Store a value for a parameter set, overwriting any prior entry.
    pub fn set(&self, params: &Value, value: V) {
        let key = self.key(params);
        self.set_by_key(key, value);
    }

    /// Store a value under a precomputed key.
    ///
    /// If the family is bounded, the oldest entries are evicted afterwards
    /// until the cache is back within its limit.
    pub fn set_by_key(&self, key: CacheKey, value: V) {
        let entry = CacheEntry::new(value);
        let mut inner = self.inner.lock();

        trace!(
            family = %self.config.family,
            key = %key,
            size_bytes = entry.size_bytes,
            "Entry inserted into cache"
        );

        // `put` on an existing key refreshes it to most-recent, which is what
        // an overwrite with a new `inserted_at` should do.
        inner.entries.put(key, entry);
        self.evict_locked(&mut inner);
    }

    /// Remove a single entry. Returns whether it was present.
    pub fn invalidate(&self, params: &Value) -> bool {
        let key = self.key(params);
        self.inner.lock().entries.pop(&key).is_some()
    }

    /// Evict oldest-inserted entries while the cache exceeds its bound.
    ///
    /// Returns the number of entries evicted. No-op for unbounded families.
    pub fn evict_if_over_capacity(&self) -> usize {
        let mut inner = self.inner.lock();
        self.evict_locked(&mut inner)
    }

    fn evict_locked(&self, inner: &mut CacheInner<V>) -> usize {
        let Some(max) = self.config.max_entries else {
            return 0;
        };

        let mut evicted = 0;
        while inner.entries.len() > max {
            if inner.entries.pop_lru().is_none() {
                break;
            }
            evicted += 1;
        }

        if evicted > 0 {
            debug!(
                family = %self.config.family,
                evicted,
                max_entries = max,
                "Evicted oldest entries over capacity"
            );
        }

        evicted
    }

    /// Remove every entry at or past its TTL.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        let expired: Vec<CacheKey> = inner
            .entries
            .iter()
            .filter(|(_, entry)| self.ttl.is_expired(entry.inserted_at, now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            inner.entries.pop(key);
        }

        let count = expired.len();
        if count > 0 {
            debug!(family = %self.config.family, count, "Swept expired entries");
        }

        count
    }

    /// Remove every entry. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let count = inner.entries.len();
        inner.entries.clear();

        debug!(family = %self.config.family, count, "Cache cleared");
        count
    }

    /// Classify every entry against the TTL at call time.
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let inner = self.inner.lock();

        let mut valid = 0;
        let mut expired = 0;
        let mut approx_bytes = 0;
        for (_, entry) in inner.entries.iter() {
            match self.ttl.classify(entry.inserted_at, now) {
                Freshness::Valid => valid += 1,
                Freshness::Expired => expired += 1,
            }
            approx_bytes += entry.size_bytes;
        }

        CacheStats {
            family: self.config.family.clone(),
            total: inner.entries.len(),
            valid,
            expired,
            ttl_ms: self.ttl.ttl().as_millis() as u64,
            max_entries: self.config.max_entries,
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            approx_bytes,
        }
    }
}

impl<V> Clone for ResponseCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            config: self.config.clone(),
            ttl: self.ttl,
            keys: self.keys.clone(),
            counters: Arc::clone(&self.counters),
        }
    }
}

/// Point-in-time statistics for one family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Family name.
    pub family: String,

    /// Resident entries, valid or not.
    pub total: usize,

    /// Entries still within their TTL.
    pub valid: usize,

    /// Entries past their TTL awaiting read-removal or sweep.
    pub expired: usize,

    /// Configured TTL in milliseconds.
    pub ttl_ms: u64,

    /// Capacity bound, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<usize>,

    /// Lookups served from cache since startup.
    pub hits: u64,

    /// Lookups that missed since startup.
    pub misses: u64,

    /// Sum of serialized entry sizes.
    pub approx_bytes: usize,
}

impl CacheStats {
    /// Fraction of lookups served from cache, if any lookups happened.
    pub fn hit_rate(&self) -> Option<f64> {
        let lookups = self.hits + self.misses;
        (lookups > 0).then(|| self.hits as f64 / lookups as f64)
    }

    /// Fraction of capacity in use, for bounded families.
    pub fn utilization(&self) -> Option<f64> {
        self.max_entries
            .filter(|max| *max > 0)
            .map(|max| self.total as f64 / max as f64)
    }

    /// Average serialized size per resident entry.
    pub fn approx_bytes_per_entry(&self) -> Option<usize> {
        (self.total > 0).then(|| self.approx_bytes / self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::time::advance;

    fn cache(ttl_ms: u64) -> ResponseCache<Value> {
        ResponseCache::new(CacheConfig::new("test").with_ttl(Duration::from_millis(ttl_ms)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_then_get_within_ttl() {
        let cache = cache(1000);
        let params = json!({"query": "rust"});

        cache.set(&params, json!({"answer": 42}));
        advance(Duration::from_millis(999)).await;

        assert_eq!(cache.get(&params), Some(json!({"answer": 42})));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_after_ttl_is_miss_and_removes() {
        let cache = cache(1000);
        let params = json!({"query": "rust"});

        cache.set(&params, json!("v"));
        advance(Duration::from_millis(1000)).await;

        assert_eq!(cache.get(&params), None);
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_semantically_equal_params_share_entry() {
        let cache = cache(1000);

        cache.set(&json!({"query": "Rust", "max_results": 5}), json!("v"));

        assert_eq!(
            cache.get(&json!({"max_results": 5, "query": "rust"})),
            Some(json!("v"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_resets_window() {
        let cache = cache(1000);
        let params = json!({"query": "rust"});

        cache.set(&params, json!("old"));
        advance(Duration::from_millis(800)).await;
        cache.set(&params, json!("new"));
        advance(Duration::from_millis(800)).await;

        assert_eq!(cache.get(&params), Some(json!("new")));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reads_do_not_extend_ttl() {
        let cache = cache(1000);
        let params = json!({"query": "rust"});

        cache.set(&params, json!("v"));
        advance(Duration::from_millis(600)).await;
        assert!(cache.get(&params).is_some());
        advance(Duration::from_millis(600)).await;

        assert!(cache.get(&params).is_none());
    }

    #[test]
    fn test_capacity_bound_evicts_oldest_inserted() {
        let cache: ResponseCache<Value> = ResponseCache::new(
            CacheConfig::new("extract")
                .with_ttl(Duration::from_secs(60))
                .with_max_entries(3),
        );

        for i in 0..10 {
            cache.set(&json!({"n": i}), json!(i));
            assert!(cache.len() <= 3);
        }

        assert_eq!(cache.len(), 3);
        assert!(cache.get(&json!({"n": 6})).is_none());
        assert_eq!(cache.get(&json!({"n": 7})), Some(json!(7)));
        assert_eq!(cache.get(&json!({"n": 9})), Some(json!(9)));
    }

    #[test]
    fn test_reads_do_not_change_eviction_order() {
        let cache: ResponseCache<Value> = ResponseCache::new(
            CacheConfig::new("extract")
                .with_ttl(Duration::from_secs(60))
                .with_max_entries(2),
        );

        cache.set(&json!({"n": 1}), json!(1));
        cache.set(&json!({"n": 2}), json!(2));
        // Reading the oldest entry must not protect it.
        assert!(cache.get(&json!({"n": 1})).is_some());
        cache.set(&json!({"n": 3}), json!(3));

        assert!(cache.get(&json!({"n": 1})).is_none());
        assert!(cache.get(&json!({"n": 2})).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_all_expired_without_reads() {
        let cache = cache(500);
        for i in 0..25 {
            cache.set(&json!({"n": i}), json!(i));
        }

        advance(Duration::from_millis(501)).await;

        assert_eq!(cache.sweep_expired(), 25);
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_keeps_fresh_entries() {
        let cache = cache(1000);
        cache.set(&json!({"n": 1}), json!(1));
        advance(Duration::from_millis(700)).await;
        cache.set(&json!({"n": 2}), json!(2));
        advance(Duration::from_millis(400)).await;

        assert_eq!(cache.sweep_expired(), 1);
        assert_eq!(cache.get(&json!({"n": 2})), Some(json!(2)));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let cache = cache(1000);
        cache.set(&json!({"n": 1}), json!(1));
        cache.set(&json!({"n": 2}), json!(2));

        assert_eq!(cache.clear(), 2);
        assert_eq!(cache.clear(), 0);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_classify_at_call_time() {
        let cache = cache(1000);
        cache.set(&json!({"n": 1}), json!(1));
        advance(Duration::from_millis(1200)).await;
        cache.set(&json!({"n": 2}), json!(2));

        let stats = cache.stats();
        assert_eq!(stats.family, "test");
        assert_eq!(stats.total, 2);
        assert_eq!(stats.valid, 1);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.ttl_ms, 1000);
        assert!(stats.approx_bytes > 0);
    }

    #[test]
    fn test_hit_and_miss_counters() {
        let cache = cache(60_000);
        let params = json!({"q": "x"});

        assert!(cache.get(&params).is_none());
        cache.set(&params, json!(1));
        assert!(cache.get(&params).is_some());
        assert!(cache.get(&params).is_some());

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), Some(2.0 / 3.0));
    }

    #[test]
    fn test_empty_stats_derived_metrics() {
        let stats = cache(1000).stats();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.hit_rate(), None);
        assert_eq!(stats.utilization(), None);
        assert_eq!(stats.approx_bytes_per_entry(), None);
    }

    #[test]
    fn test_clones_share_state() {
        let cache = cache(60_000);
        let handle = cache.clone();

        handle.set(&json!({"n": 1}), json!(1));
        assert_eq!(cache.get(&json!({"n": 1})), Some(json!(1)));
    }

    #[test]
    fn test_invalidate() {
        let cache = cache(60_000);
        cache.set(&json!({"n": 1}), json!(1));

        assert!(cache.invalidate(&json!({"n": 1})));
        assert!(!cache.invalidate(&json!({"n": 1})));
        assert!(cache.is_empty());
    }
}
