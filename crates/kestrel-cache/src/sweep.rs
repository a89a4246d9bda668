//! Background sweeping of expired entries.
//!
//! Sweeps run on a fixed interval regardless of read traffic, so memory stays
//! bounded even for families nobody is reading from.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::control::{CacheControl, CacheSet};

/// Spawn a task that sweeps `cache` every `every` until `shutdown` fires.
pub fn spawn_sweeper(
    cache: Arc<dyn CacheControl>,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(family = %cache.family(), interval_ms = every.as_millis() as u64, "Cache sweeper started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = cache.sweep_expired();
                    if removed > 0 {
                        info!(family = %cache.family(), removed, "Periodic sweep removed expired entries");
                    }
                }
            }
        }

        debug!(family = %cache.family(), "Cache sweeper stopped");
    })
}

/// Spawn one sweeper per family, each on its family's configured interval.
pub fn spawn_sweepers(set: &CacheSet, shutdown: &CancellationToken) -> Vec<JoinHandle<()>> {
    set.iter()
        .map(|cache| {
            let every = cache.sweep_interval();
            spawn_sweeper(Arc::clone(cache), every, shutdown.child_token())
        })
        .collect()
}
