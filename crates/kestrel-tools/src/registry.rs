//! Tool registry.
//!
//! Tools are registered once at startup. The registry is then frozen behind
//! an `Arc` and only read; there is no way to add or remove tools while
//! serving.

use std::collections::BTreeMap;
use std::sync::Arc;

use kestrel_cache::ResponseCache;
use serde_json::Value;
use tracing::debug;

use crate::cached::CachedTool;
use crate::error::RegistryError;
use crate::schema::ArgumentSchema;
use crate::tool::{Tool, ToolDescriptor};

/// A registered tool with its compiled argument schema.
#[derive(Clone)]
pub struct RegisteredTool {
    /// The handler.
    pub tool: Arc<dyn Tool>,
    /// Compiled input schema.
    pub schema: Arc<ArgumentSchema>,
}

/// Registry of available tools, keyed and listed by name.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, RegisteredTool>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool.
    ///
    /// Fails if the name is taken or the input schema does not compile.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<(), RegistryError> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a tool from an Arc.
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }

        let schema = ArgumentSchema::compile(&name, &tool.input_schema())?;
        debug!(tool = %name, "Registered tool");
        self.tools.insert(
            name,
            RegisteredTool {
                tool,
                schema: Arc::new(schema),
            },
        );
        Ok(())
    }

    /// Register a tool whose successful results are served from `cache`.
    ///
    /// Only tools annotated idempotent may be cached.
    pub fn register_cached<T: Tool + 'static>(
        &mut self,
        tool: T,
        cache: ResponseCache<Value>,
    ) -> Result<(), RegistryError> {
        if !tool.annotations().idempotent_hint {
            return Err(RegistryError::NotIdempotent(tool.name().to_string()));
        }
        self.register(CachedTool::new(Arc::new(tool), cache))
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    /// Check if a tool exists.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Descriptors of every tool, sorted by name.
    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|entry| ToolDescriptor::of(entry.tool.as_ref()))
            .collect()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::EchoTool;
    use kestrel_cache::CacheConfig;
    use serde_json::json;

    #[test]
    fn test_register_and_list_sorted() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool::named("zeta")).unwrap();
        registry.register(EchoTool::named("alpha")).unwrap();

        assert_eq!(registry.len(), 2);
        let names: Vec<String> = registry.list().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool::named("search")).unwrap();

        let err = registry.register(EchoTool::named("search")).unwrap_err();
        assert_eq!(err, RegistryError::Duplicate("search".to_string()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_cached_requires_idempotent() {
        let mut registry = ToolRegistry::new();
        let cache = ResponseCache::new(CacheConfig::new("search"));

        let err = registry
            .register_cached(EchoTool::named("mutator").non_idempotent(), cache.clone())
            .unwrap_err();
        assert_eq!(err, RegistryError::NotIdempotent("mutator".to_string()));

        registry
            .register_cached(EchoTool::named("echo"), cache)
            .unwrap();
        assert!(registry.contains("echo"));
    }

    #[test]
    fn test_cached_and_plain_names_collide() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool::named("echo")).unwrap();

        let err = registry
            .register_cached(
                EchoTool::named("echo"),
                ResponseCache::new(CacheConfig::new("search")),
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate(_)));
    }

    #[test]
    fn test_invalid_schema_rejected_at_registration() {
        let mut registry = ToolRegistry::new();
        let err = registry
            .register(EchoTool::named("bad").with_schema(json!({"type": "nonsense"})))
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidSchema { .. }));
        assert!(registry.is_empty());
    }
}
