//! Response cache with per-family TTLs, capacity eviction, and sweeping.
//!
//! Each cacheable concern (search results, extracted page content, market
//! quotes, ...) gets its own [`ResponseCache`] instance so that a short-TTL,
//! high-churn family never pressures eviction of a long-TTL one, and so an
//! operator can clear one family without disturbing the others.
//!
//! - Keys are SHA-256 digests of a normalized, canonical form of the request
//!   parameters (see [`KeyPolicy`]).
//! - An entry is never served once `now - inserted_at >= ttl`, whether or not
//!   the background sweep has run yet.
//! - Bounded instances evict the oldest-inserted entries first.
//!
//! # Example
//!
//! ```rust,ignore
//! use kestrel_cache::{CacheConfig, ResponseCache};
//!
//! let cache = ResponseCache::new(
//!     CacheConfig::new("extract")
//!         .with_ttl(Duration::from_secs(3600))
//!         .with_max_entries(500),
//! );
//!
//! let params = json!({"urls": ["https://example.com"]});
//! if cache.get(&params).is_none() {
//!     cache.set(&params, fetch(&params).await?);
//! }
//! ```

mod cache;
mod config;
mod control;
mod error;
mod key;
mod sweep;
mod ttl;

pub use cache::{CacheEntry, CacheStats, ResponseCache};
pub use config::CacheConfig;
pub use control::{CacheControl, CacheSet};
pub use error::{Error, Result};
pub use key::{CacheKey, KeyPolicy};
pub use sweep::{spawn_sweeper, spawn_sweepers};
pub use ttl::{Freshness, TtlPolicy};
