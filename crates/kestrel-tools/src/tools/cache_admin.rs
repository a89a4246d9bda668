//! Cache administration tools: `clear_cache` and `cache_stats`.

use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use kestrel_cache::{CacheSet, CacheStats};
use kestrel_mcp::ToolAnnotations;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::error::{Result, ToolError};
use crate::params::{ParamExt, ParameterValidationError};
use crate::tool::{Tool, ToolContext, ToolOutput};

/// Scope name meaning every family.
pub const SCOPE_ALL: &str = "all";

/// Expired entries at or above this count trigger a clear recommendation.
const EXPIRED_COUNT_THRESHOLD: usize = 10;
/// Expired share of entries at or above this ratio triggers a clear
/// recommendation.
const EXPIRED_RATIO_THRESHOLD: f64 = 0.25;
/// Utilization at or above this ratio triggers a capacity recommendation.
const UTILIZATION_THRESHOLD: f64 = 0.9;
/// Hit rate below this triggers a TTL recommendation...
const HIT_RATE_THRESHOLD: f64 = 0.2;
/// ...once at least this many lookups have happened.
const MIN_LOOKUPS_FOR_HIT_RATE: u64 = 20;

// ─────────────────────────────────────────────────────────────────────────────
// clear_cache
// ─────────────────────────────────────────────────────────────────────────────

/// Clears one cache family, or all of them.
#[derive(Debug, Clone)]
pub struct ClearCacheTool {
    caches: CacheSet,
}

impl ClearCacheTool {
    /// Create the tool over a set of families.
    pub fn new(caches: CacheSet) -> Self {
        Self { caches }
    }

    fn scopes(&self) -> Vec<String> {
        let mut scopes: Vec<String> = self.caches.names().into_iter().map(String::from).collect();
        scopes.push(SCOPE_ALL.to_string());
        scopes
    }

    fn families_for<'a>(&'a self, scope: &'a str) -> Vec<&'a str> {
        if scope == SCOPE_ALL {
            self.caches.names()
        } else {
            vec![scope]
        }
    }
}

#[async_trait]
impl Tool for ClearCacheTool {
    fn name(&self) -> &str {
        "clear_cache"
    }

    fn description(&self) -> &str {
        "Remove cached responses for one family or for all families. Subsequent calls fetch fresh data."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "scope": {
                    "type": "string",
                    "enum": self.scopes(),
                    "description": "Cache family to clear, or \"all\""
                }
            },
            "required": ["scope"]
        })
    }

    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations {
            read_only_hint: false,
            destructive_hint: true,
            idempotent_hint: true,
            open_world_hint: false,
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        let scope = params.required_str("scope", "pass a cache family name or \"all\"")?;
        if scope != SCOPE_ALL && !self.caches.contains(scope) {
            return Err(ParameterValidationError::invalid_value(
                "scope",
                scope,
                format!("must be one of {}", self.scopes().join(", ")),
            )
            .into());
        }
        Ok(())
    }

    async fn execute(&self, params: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let scope = params.required_str("scope", "pass a cache family name or \"all\"")?;

        let mut results = Map::new();
        let mut total_cleared = 0usize;
        for family in self.families_for(scope) {
            let cache = self
                .caches
                .get(family)
                .map_err(|e| ToolError::validation(e.to_string()))?;

            match std::panic::catch_unwind(AssertUnwindSafe(|| cache.clear())) {
                Ok(cleared) => {
                    total_cleared += cleared;
                    results.insert(family.to_string(), json!({ "cleared": cleared }));
                }
                Err(_) => {
                    warn!(family, "Failed to clear cache family");
                    results.insert(
                        family.to_string(),
                        json!({ "error": "failed to clear this family" }),
                    );
                }
            }
        }

        info!(scope, total_cleared, "Cache cleared by request");

        Ok(ToolOutput::new(json!({
            "scope": scope,
            "results": results,
            "total_cleared": total_cleared,
        })))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// cache_stats
// ─────────────────────────────────────────────────────────────────────────────

/// Kind of operator action suggested by `cache_stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    /// Many expired entries are still resident.
    ClearExpired,
    /// The family is near its capacity bound.
    RaiseCapacity,
    /// Few lookups are served from cache.
    RaiseTtl,
}

/// A tuning suggestion for one family.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    /// Family the suggestion is about.
    pub family: String,
    /// What to do.
    pub kind: RecommendationKind,
    /// Human-readable explanation.
    pub message: String,
}

/// Suggestions for one family, derived only from its statistics.
pub fn recommendations(stats: &CacheStats) -> Vec<Recommendation> {
    let mut out = Vec::new();
    let family = &stats.family;

    let expired_ratio = if stats.total > 0 {
        stats.expired as f64 / stats.total as f64
    } else {
        0.0
    };
    if stats.expired >= EXPIRED_COUNT_THRESHOLD
        || (stats.expired > 0 && expired_ratio >= EXPIRED_RATIO_THRESHOLD)
    {
        out.push(Recommendation {
            family: family.clone(),
            kind: RecommendationKind::ClearExpired,
            message: format!(
                "{} expired of {} entries are awaiting the sweep; clear_cache with scope \"{}\" reclaims them now",
                stats.expired, stats.total, family
            ),
        });
    }

    if let Some(utilization) = stats.utilization()
        && utilization >= UTILIZATION_THRESHOLD
    {
        out.push(Recommendation {
            family: family.clone(),
            kind: RecommendationKind::RaiseCapacity,
            message: format!(
                "at {:.0}% of capacity; raise max_entries to avoid evicting live entries",
                utilization * 100.0
            ),
        });
    }

    let lookups = stats.hits + stats.misses;
    if let Some(hit_rate) = stats.hit_rate()
        && lookups >= MIN_LOOKUPS_FOR_HIT_RATE
        && hit_rate < HIT_RATE_THRESHOLD
    {
        out.push(Recommendation {
            family: family.clone(),
            kind: RecommendationKind::RaiseTtl,
            message: format!(
                "hit rate {:.0}% over {} lookups; a longer TTL would serve more calls from cache",
                hit_rate * 100.0,
                lookups
            ),
        });
    }

    out
}

/// Reports per-family cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStatsTool {
    caches: CacheSet,
}

impl CacheStatsTool {
    /// Create the tool over a set of families.
    pub fn new(caches: CacheSet) -> Self {
        Self { caches }
    }

    fn family_report(stats: &CacheStats, detailed: bool) -> Result<Value> {
        let mut report = serde_json::to_value(stats)?;
        if detailed && let Value::Object(map) = &mut report {
            map.insert("utilization".to_string(), json!(stats.utilization()));
            map.insert("hit_rate".to_string(), json!(stats.hit_rate()));
            map.insert("estimated_calls_avoided".to_string(), json!(stats.hits));
            map.insert(
                "approx_bytes_per_entry".to_string(),
                json!(stats.approx_bytes_per_entry()),
            );
        }
        Ok(report)
    }
}

#[async_trait]
impl Tool for CacheStatsTool {
    fn name(&self) -> &str {
        "cache_stats"
    }

    fn description(&self) -> &str {
        "Report entry counts, TTLs and hit rates for every cache family. With detailed=true, also estimate memory use and suggest tuning."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "detailed": {
                    "type": "boolean",
                    "description": "Include derived metrics and recommendations"
                }
            }
        })
    }

    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations::read_only_local()
    }

    async fn execute(&self, params: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let detailed = params.optional_bool("detailed", false);
        let all = self.caches.stats();

        let mut families = Map::new();
        for stats in &all {
            families.insert(stats.family.clone(), Self::family_report(stats, detailed)?);
        }

        let totals = json!({
            "total": all.iter().map(|s| s.total).sum::<usize>(),
            "valid": all.iter().map(|s| s.valid).sum::<usize>(),
            "expired": all.iter().map(|s| s.expired).sum::<usize>(),
        });

        let mut report = json!({
            "families": families,
            "totals": totals,
        });

        if detailed {
            let recs: Vec<Recommendation> = all.iter().flat_map(recommendations).collect();
            report["recommendations"] = serde_json::to_value(recs)?;
        }

        Ok(ToolOutput::new(report))
    }
}
