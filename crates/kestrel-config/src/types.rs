//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [server]                  # listener and session settings
//! [provider]                # upstream data provider
//! [cache]                   # sweep interval
//! [cache.families.search]   # per-family TTL and capacity overrides
//! [health]                  # health snapshot TTL
//! ```

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ConfigError, Result};

/// Environment variable supplying the provider API key.
pub const ENV_API_KEY: &str = "KESTREL_API_KEY";
/// Environment variable overriding `server.bind`.
pub const ENV_BIND: &str = "KESTREL_BIND";
/// Environment variable overriding `provider.base_url`.
pub const ENV_PROVIDER_URL: &str = "KESTREL_PROVIDER_URL";

/// Cache families the gateway knows about, with their default TTL in
/// seconds and default capacity.
pub const FAMILY_DEFAULTS: &[(&str, u64, Option<usize>)] = &[
    ("search", 300, None),
    ("extract", 3600, Some(500)),
    ("finance", 60, None),
];

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// Every section has defaults, so an empty file (or no file) yields a
/// working configuration apart from the API key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KestrelConfig {
    /// Listener and session settings.
    pub server: ServerConfig,
    /// Upstream provider.
    pub provider: ProviderConfig,
    /// Response caches.
    pub cache: CacheConfig,
    /// Health reporting.
    pub health: HealthConfig,
}

impl KestrelConfig {
    /// Create a config with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string. Does not validate.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Apply environment overrides using `lookup` to read variables.
    ///
    /// Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.provider.api_key = Some(key);
        }
        if let Some(bind) = get(ENV_BIND) {
            self.server.bind = bind;
        }
        if let Some(url) = get(ENV_PROVIDER_URL) {
            self.provider.base_url = url;
        }
    }

    /// Check every invariant the rest of the system relies on.
    pub fn validate(&self) -> Result<()> {
        self.server.socket_addr()?;
        if self.server.session_queue_depth == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "server.session_queue_depth".to_string(),
            });
        }
        if self.server.keep_alive_secs == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "server.keep_alive_secs".to_string(),
            });
        }

        self.provider.url()?;
        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "provider.timeout_secs".to_string(),
            });
        }

        if self.cache.sweep_interval_secs == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "cache.sweep_interval_secs".to_string(),
            });
        }
        if self.health.ttl_secs == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "health.ttl_secs".to_string(),
            });
        }

        for name in self.cache.families.keys() {
            if !FAMILY_DEFAULTS.iter().any(|(known, _, _)| known == name) {
                return Err(ConfigError::UnknownFamily {
                    name: name.clone(),
                    expected: FAMILY_DEFAULTS
                        .iter()
                        .map(|(n, _, _)| *n)
                        .collect::<Vec<_>>()
                        .join(", "),
                });
            }
        }

        for family in self.families() {
            if family.ttl_secs == 0 {
                return Err(ConfigError::ZeroDuration {
                    field: format!("cache.families.{}.ttl_secs", family.name),
                });
            }
            if family.max_entries == Some(0) {
                return Err(ConfigError::ZeroLimit {
                    field: format!("cache.families.{}.max_entries", family.name),
                });
            }
            if self.health.ttl_secs >= family.ttl_secs {
                return Err(ConfigError::HealthTtlTooLong {
                    health_secs: self.health.ttl_secs,
                    family: family.name.clone(),
                    family_secs: family.ttl_secs,
                });
            }
        }

        Ok(())
    }

    /// Every cache family with overrides applied over the defaults.
    pub fn families(&self) -> Vec<ResolvedFamily> {
        FAMILY_DEFAULTS
            .iter()
            .map(|(name, ttl_secs, max_entries)| {
                let overrides = self.cache.families.get(*name);
                ResolvedFamily {
                    name: name.to_string(),
                    ttl_secs: overrides.and_then(|o| o.ttl_secs).unwrap_or(*ttl_secs),
                    max_entries: overrides
                        .and_then(|o| o.max_entries)
                        .or(*max_entries),
                }
            })
            .collect()
    }

    /// Configuration values the gateway needs to be fully functional, with
    /// whether each one is set.
    pub fn required_values(&self) -> Vec<RequiredValue> {
        vec![RequiredValue {
            name: "provider.api_key",
            present: self
                .provider
                .api_key
                .as_deref()
                .is_some_and(|k| !k.trim().is_empty()),
        }]
    }
}

/// A configuration value the gateway needs, and whether it is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RequiredValue {
    /// Dotted config path.
    pub name: &'static str,
    /// Whether it is set.
    pub present: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Server Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to, as `host:port`.
    pub bind: String,
    /// Inbound messages buffered per session before new ones are refused.
    pub session_queue_depth: usize,
    /// Interval between SSE keep-alive comments.
    pub keep_alive_secs: u64,
}

impl ServerConfig {
    /// Parsed bind address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
                field: "server.bind".to_string(),
                message: e.to_string(),
            })
    }

    /// Keep-alive interval.
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            session_queue_depth: 64,
            keep_alive_secs: 15,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Upstream provider configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider name, for logs.
    pub name: String,
    /// Base URL; operations are appended as path segments.
    pub base_url: String,
    /// Per-call timeout.
    pub timeout_secs: u64,
    /// API key. Normally supplied via `KESTREL_API_KEY`.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl ProviderConfig {
    /// Parsed base URL.
    pub fn url(&self) -> Result<Url> {
        Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidValue {
            field: "provider.base_url".to_string(),
            message: e.to_string(),
        })
    }

    /// Per-call timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "tavily".to_string(),
            base_url: "https://api.tavily.com".to_string(),
            timeout_secs: 30,
            api_key: None,
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Cache configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Interval between background sweeps of expired entries.
    pub sweep_interval_secs: u64,
    /// Per-family overrides, keyed by family name.
    pub families: BTreeMap<String, FamilyConfig>,
}

impl CacheConfig {
    /// Sweep interval.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 60,
            families: BTreeMap::new(),
        }
    }
}

/// Overrides for one cache family. Unset fields keep the family default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FamilyConfig {
    /// Entry time-to-live.
    pub ttl_secs: Option<u64>,
    /// Capacity bound.
    pub max_entries: Option<usize>,
}

/// A cache family with defaults and overrides merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFamily {
    /// Family name.
    pub name: String,
    /// Entry time-to-live in seconds.
    pub ttl_secs: u64,
    /// Capacity bound.
    pub max_entries: Option<usize>,
}

impl ResolvedFamily {
    /// Entry time-to-live.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Health Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Health reporting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// How long a computed health snapshot is served before recomputing.
    pub ttl_secs: u64,
}

impl HealthConfig {
    /// Snapshot time-to-live.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self { ttl_secs: 30 }
    }
}
