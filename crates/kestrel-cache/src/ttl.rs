//! TTL classification for cache entries.

use std::time::Duration;

use tokio::time::Instant;

/// Whether an entry may still be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Younger than the TTL.
    Valid,
    /// At or past the TTL. Must never be returned as a hit.
    Expired,
}

/// Classifies entries against a fixed TTL measured from insertion time.
///
/// Unlike an access-time tracker, reads never extend an entry's life: the
/// window starts at `set` and ends `ttl` later regardless of traffic.
#[derive(Debug, Clone, Copy)]
pub struct TtlPolicy {
    ttl: Duration,
}

impl TtlPolicy {
    /// Create a policy with the given TTL.
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// The configured TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Classify an entry inserted at `inserted_at`, as seen at `now`.
    pub fn classify(&self, inserted_at: Instant, now: Instant) -> Freshness {
        if now.saturating_duration_since(inserted_at) >= self.ttl {
            Freshness::Expired
        } else {
            Freshness::Valid
        }
    }

    /// Shorthand for `classify(..) == Freshness::Expired`.
    pub fn is_expired(&self, inserted_at: Instant, now: Instant) -> bool {
        self.classify(inserted_at, now) == Freshness::Expired
    }
}
