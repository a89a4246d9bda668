//! Startup assembly of cache families, tools and application state.

use std::sync::Arc;

use kestrel_cache::{CacheConfig, CacheSet, ResponseCache};
use kestrel_config::{KestrelConfig, ResolvedFamily};
use kestrel_tools::{
    CacheStatsTool, ClearCacheTool, Dispatcher, ProviderTool, ToolRegistry, Upstream,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::health::{HealthCheckTool, HealthReporter};
use crate::rpc::RpcRouter;
use crate::session::SessionManager;
use crate::state::AppState;

/// Everything built at startup before the registry is frozen.
///
/// Extra tools may be registered on [`registry`](Gateway::registry) before
/// calling [`into_state`](Gateway::into_state).
pub struct Gateway {
    /// Cache families, one per cacheable provider tool.
    pub caches: CacheSet,
    /// Tool registry, still open for registration.
    pub registry: ToolRegistry,
    /// Shared health reporter.
    pub health: Arc<HealthReporter>,
}

impl Gateway {
    /// Build the cache families and the standard tool set: the provider
    /// tools (each behind its family cache), `clear_cache`, `cache_stats`
    /// and `health_check`.
    pub fn from_config(config: &KestrelConfig, upstream: Arc<dyn Upstream>) -> Result<Self> {
        let families = config.families();
        let mut caches = CacheSet::new();
        let mut registry = ToolRegistry::new();

        for tool in ProviderTool::builtin(upstream, config.provider.timeout()) {
            let family = families
                .iter()
                .find(|f| f.name == tool.family())
                .ok_or_else(|| {
                    ServerError::Config(format!("no cache family named '{}'", tool.family()))
                })?;

            let cache: ResponseCache<Value> = ResponseCache::with_key_policy(
                cache_config(family, config),
                tool.key_policy(),
            );
            caches.insert(Arc::new(cache.clone()))?;
            registry.register_cached(tool, cache)?;
        }

        registry.register(ClearCacheTool::new(caches.clone()))?;
        registry.register(CacheStatsTool::new(caches.clone()))?;

        let health = Arc::new(HealthReporter::from_config(config, caches.clone()));
        registry.register(HealthCheckTool::new(Arc::clone(&health)))?;

        info!(
            tools = registry.len(),
            families = caches.len(),
            "Gateway assembled"
        );

        Ok(Self {
            caches,
            registry,
            health,
        })
    }

    /// Freeze the registry and build the shared application state.
    pub fn into_state(self, config: ServerConfig, shutdown: CancellationToken) -> AppState {
        let dispatcher = Dispatcher::new(Arc::new(self.registry));
        let router = RpcRouter::new(dispatcher).with_instructions(config.instructions.clone());
        let sessions = SessionManager::new(
            Arc::new(router),
            config.session_queue_depth,
            shutdown.clone(),
        );
        AppState::new(config, sessions, self.health, shutdown)
    }
}

fn cache_config(family: &ResolvedFamily, config: &KestrelConfig) -> CacheConfig {
    let cache_config = CacheConfig::new(family.name.clone())
        .with_ttl(family.ttl())
        .with_sweep_interval(config.cache.sweep_interval());
    match family.max_entries {
        Some(max) => cache_config.with_max_entries(max),
        None => cache_config,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use kestrel_tools::RegistryError;
    use kestrel_tools::testing::{EchoTool, MockUpstream};

    fn gateway() -> Gateway {
        Gateway::from_config(&KestrelConfig::default(), Arc::new(MockUpstream::new())).unwrap()
    }

    #[test]
    fn test_standard_tool_set() {
        let gateway = gateway();
        assert_eq!(
            gateway.registry.names(),
            vec![
                "cache_stats",
                "clear_cache",
                "extract",
                "health_check",
                "quote",
                "search"
            ]
        );
        assert_eq!(gateway.caches.names(), vec!["extract", "finance", "search"]);
    }

    #[test]
    fn test_family_settings_applied() {
        let config = KestrelConfig::from_toml(
            r#"
            [cache.families.search]
            ttl_secs = 120
            max_entries = 50
            "#,
        )
        .unwrap();
        let gateway = Gateway::from_config(&config, Arc::new(MockUpstream::new())).unwrap();

        let search = gateway.caches.get("search").unwrap().stats();
        assert_eq!(search.ttl_ms, 120_000);
        assert_eq!(search.max_entries, Some(50));

        let extract = gateway.caches.get("extract").unwrap().stats();
        assert_eq!(extract.ttl_ms, 3_600_000);
        assert_eq!(extract.max_entries, Some(500));

        assert_eq!(
            gateway.caches.get("search").unwrap().sweep_interval(),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut gateway = gateway();
        let err = gateway
            .registry
            .register(EchoTool::named("search"))
            .unwrap_err();
        assert_eq!(err, RegistryError::Duplicate("search".to_string()));
    }

    #[tokio::test]
    async fn test_into_state() {
        let mut gateway = gateway();
        gateway.registry.register(EchoTool::new()).unwrap();

        let state = gateway.into_state(ServerConfig::new(), CancellationToken::new());
        assert!(state.sessions.is_empty());
        assert_eq!(state.config.session_queue_depth, 64);
    }
}
