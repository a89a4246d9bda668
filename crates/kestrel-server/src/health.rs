//! Health reporting.
//!
//! Health is computed from configuration presence and cache statistics only.
//! It never calls an upstream provider and never inspects cached values, so
//! it answers the same whether or not the provider is reachable.
//!
//! Snapshots are themselves cached for the health TTL. A report served from
//! that cache is `fresh`; one that had to be recomputed is `stale`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kestrel_cache::{CacheConfig, CacheKey, CacheSet, CacheStats, ResponseCache};
use kestrel_config::{KestrelConfig, RequiredValue};
use kestrel_mcp::ToolAnnotations;
use kestrel_tools::{Result as ToolResult, Tool, ToolContext, ToolOutput};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

/// Overall service status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Every required configuration value is present.
    Healthy,
    /// At least one required configuration value is missing.
    Degraded,
}

/// Whether a report came from the snapshot cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFreshness {
    /// Served from a snapshot computed within the health TTL.
    Fresh,
    /// Recomputed for this request.
    Stale,
}

/// A computed health snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    /// Overall status.
    pub status: HealthStatus,
    /// When the snapshot was computed.
    pub computed_at: DateTime<Utc>,
    /// Required configuration values and whether each is set.
    pub configuration: BTreeMap<String, bool>,
    /// Statistics for each cache family.
    pub caches: Vec<CacheStats>,
}

/// Response body of `GET /health` and the `health_check` tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// Overall status.
    pub status: HealthStatus,
    /// When this report was produced.
    pub timestamp: DateTime<Utc>,
    /// When the underlying snapshot was computed.
    pub computed_at: DateTime<Utc>,
    /// Whether the snapshot came from cache.
    pub freshness: ReportFreshness,
    /// Required configuration values and whether each is set.
    pub configuration: BTreeMap<String, bool>,
    /// Statistics for each cache family.
    pub caches: Vec<CacheStats>,
}

impl HealthReport {
    fn new(snapshot: HealthSnapshot, freshness: ReportFreshness) -> Self {
        Self {
            status: snapshot.status,
            timestamp: Utc::now(),
            computed_at: snapshot.computed_at,
            freshness,
            configuration: snapshot.configuration,
            caches: snapshot.caches,
        }
    }
}

/// Produces health reports, recomputing at most once per TTL window.
pub struct HealthReporter {
    snapshots: ResponseCache<HealthSnapshot>,
    key: CacheKey,
    required: Vec<RequiredValue>,
    caches: CacheSet,
}

impl HealthReporter {
    /// Create a reporter over `caches` with the given required values and
    /// snapshot TTL.
    pub fn new(required: Vec<RequiredValue>, caches: CacheSet, ttl: Duration) -> Self {
        let snapshots = ResponseCache::new(
            CacheConfig::new("health")
                .with_ttl(ttl)
                .with_max_entries(1),
        );
        let key = snapshots.key(&json!({"report": "health"}));
        Self {
            snapshots,
            key,
            required,
            caches,
        }
    }

    /// Create a reporter from the loaded configuration.
    pub fn from_config(config: &KestrelConfig, caches: CacheSet) -> Self {
        Self::new(config.required_values(), caches, config.health.ttl())
    }

    /// The current report.
    pub fn report(&self) -> HealthReport {
        if let Some(snapshot) = self.snapshots.get_by_key(&self.key) {
            return HealthReport::new(snapshot, ReportFreshness::Fresh);
        }

        let snapshot = self.compute();
        debug!(status = ?snapshot.status, "Health snapshot recomputed");
        self.snapshots.set_by_key(self.key.clone(), snapshot.clone());
        HealthReport::new(snapshot, ReportFreshness::Stale)
    }

    fn compute(&self) -> HealthSnapshot {
        let configuration: BTreeMap<String, bool> = self
            .required
            .iter()
            .map(|value| (value.name.to_string(), value.present))
            .collect();

        let status = if configuration.values().all(|present| *present) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        HealthSnapshot {
            status,
            computed_at: Utc::now(),
            configuration,
            caches: self.caches.stats(),
        }
    }
}

impl std::fmt::Debug for HealthReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthReporter")
            .field("ttl", &self.snapshots.ttl())
            .field("required", &self.required)
            .field("families", &self.caches.names())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// health_check tool
// ─────────────────────────────────────────────────────────────────────────────

/// Exposes the health report as a tool.
#[derive(Debug, Clone)]
pub struct HealthCheckTool {
    reporter: Arc<HealthReporter>,
}

impl HealthCheckTool {
    /// Create the tool over a shared reporter.
    pub fn new(reporter: Arc<HealthReporter>) -> Self {
        Self { reporter }
    }
}

#[async_trait]
impl Tool for HealthCheckTool {
    fn name(&self) -> &str {
        "health_check"
    }

    fn description(&self) -> &str {
        "Report service health: configuration completeness and cache statistics. \
         Makes no upstream calls."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations::read_only_local()
    }

    async fn execute(&self, _params: Value, _ctx: &ToolContext) -> ToolResult<ToolOutput> {
        let report = self.reporter.report();
        Ok(ToolOutput::new(serde_json::to_value(report)?))
    }
}
