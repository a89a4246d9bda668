//! Test doubles for tools and upstreams.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use kestrel_mcp::ToolAnnotations;
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::error::{Result, ToolError, UpstreamError};
use crate::tool::{Tool, ToolContext, ToolOutput};
use crate::upstream::Upstream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EchoBehavior {
    Echo,
    FailUpstream,
    Panic,
}

/// A tool that returns `{"echo": <arguments>}` and counts executions.
///
/// Clones share the call counter.
#[derive(Debug, Clone)]
pub struct EchoTool {
    name: String,
    schema: Value,
    annotations: ToolAnnotations,
    behavior: EchoBehavior,
    calls: Arc<AtomicUsize>,
}

impl EchoTool {
    /// An idempotent, read-only echo tool named `echo`.
    pub fn new() -> Self {
        Self::named("echo")
    }

    /// An idempotent, read-only echo tool with a custom name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: json!({
                "type": "object",
                "properties": {
                    "message": {"type": "string"}
                }
            }),
            annotations: ToolAnnotations::read_only_local(),
            behavior: EchoBehavior::Echo,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replace the input schema.
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = schema;
        self
    }

    /// Drop the idempotent annotation.
    pub fn non_idempotent(mut self) -> Self {
        self.annotations.idempotent_hint = false;
        self.annotations.read_only_hint = false;
        self
    }

    /// Fail every call with an upstream error.
    pub fn failing(mut self) -> Self {
        self.behavior = EchoBehavior::FailUpstream;
        self
    }

    /// Panic on every call.
    pub fn panicking(mut self) -> Self {
        self.behavior = EchoBehavior::Panic;
        self
    }

    /// Number of times `execute` ran.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for EchoTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Returns its arguments"
    }

    fn input_schema(&self) -> Value {
        self.schema.clone()
    }

    fn annotations(&self) -> ToolAnnotations {
        self.annotations
    }

    async fn execute(&self, params: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            EchoBehavior::Echo => Ok(ToolOutput::new(json!({ "echo": params }))),
            EchoBehavior::FailUpstream => Err(ToolError::Upstream(UpstreamError::Status {
                operation: self.name.clone(),
                status: 503,
            })),
            EchoBehavior::Panic => panic!("echo tool asked to panic"),
        }
    }
}

/// Scripted upstream that records every call.
///
/// Queued responses are returned in order; once the queue is empty each call
/// answers `{"operation": ..., "params": ...}`.
#[derive(Debug, Default)]
pub struct MockUpstream {
    responses: Mutex<VecDeque<std::result::Result<Value, UpstreamError>>>,
    calls: Mutex<Vec<(String, Value)>>,
    delay: Option<Duration>,
}

impl MockUpstream {
    /// Create a mock that echoes every call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a response.
    pub fn push_response(&self, response: std::result::Result<Value, UpstreamError>) {
        self.responses.lock().push_back(response);
    }

    /// Calls made so far, as `(operation, params)`.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    /// Number of calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Upstream for MockUpstream {
    fn name(&self) -> &str {
        "mock"
    }

    async fn invoke(
        &self,
        operation: &str,
        params: Value,
    ) -> std::result::Result<Value, UpstreamError> {
        self.calls.lock().push((operation.to_string(), params.clone()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.responses.lock().pop_front();
        scripted.unwrap_or_else(|| Ok(json!({"operation": operation, "params": params})))
    }
}
