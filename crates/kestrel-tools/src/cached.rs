//! Read-through caching wrapper for idempotent tools.

use std::sync::Arc;

use async_trait::async_trait;
use kestrel_cache::ResponseCache;
use kestrel_mcp::ToolAnnotations;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::Result;
use crate::tool::{CacheStatus, Tool, ToolContext, ToolOutput};

/// Serves repeated calls from a [`ResponseCache`] and stores fresh
/// successes.
///
/// Failures are passed through and never stored, so a transient upstream
/// error is retried on the next call. Keys include the tool name, so tools
/// sharing a family never see each other's entries.
pub struct CachedTool {
    inner: Arc<dyn Tool>,
    cache: ResponseCache<Value>,
}

impl CachedTool {
    /// Wrap `inner`. Use [`ToolRegistry::register_cached`] to get the
    /// idempotence check.
    ///
    /// [`ToolRegistry::register_cached`]: crate::ToolRegistry::register_cached
    pub fn new(inner: Arc<dyn Tool>, cache: ResponseCache<Value>) -> Self {
        Self { inner, cache }
    }

    /// The backing cache.
    pub fn cache(&self) -> &ResponseCache<Value> {
        &self.cache
    }
}

#[async_trait]
impl Tool for CachedTool {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn input_schema(&self) -> Value {
        self.inner.input_schema()
    }

    fn annotations(&self) -> ToolAnnotations {
        self.inner.annotations()
    }

    fn validate(&self, params: &Value) -> Result<()> {
        self.inner.validate(params)
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let key = self
            .cache
            .key(&json!({ "tool": self.inner.name(), "arguments": &params }));

        if let Some(value) = self.cache.get_by_key(&key) {
            return Ok(ToolOutput::with_cache(value, CacheStatus::Hit));
        }

        let output = self.inner.execute(params, ctx).await?;
        debug!(tool = %self.inner.name(), family = %self.cache.family(), "Storing fresh result");
        self.cache.set_by_key(key, output.value.clone());

        Ok(ToolOutput::with_cache(output.value, CacheStatus::Miss))
    }
}
