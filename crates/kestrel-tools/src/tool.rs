//! Tool framework.
//!
//! This module defines the [`Tool`] trait that every invocable operation
//! implements, plus the context and output types passed through dispatch.
//!
//! # Example
//!
//! ```rust,ignore
//! use kestrel_tools::{Tool, ToolContext, ToolOutput};
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Tool for Echo {
//!     fn name(&self) -> &str { "echo" }
//!     fn description(&self) -> &str { "Returns its arguments" }
//!     fn input_schema(&self) -> Value { json!({"type": "object"}) }
//!
//!     async fn execute(&self, params: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
//!         Ok(ToolOutput::new(params))
//!     }
//! }
//! ```

use async_trait::async_trait;
use kestrel_mcp::{ToolAnnotations, ToolInfo};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::Result;

// ─────────────────────────────────────────────────────────────────────────────
// Tool Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A named, remotely invocable operation.
///
/// Arguments are checked against [`input_schema`](Tool::input_schema) and
/// then [`validate`](Tool::validate) before [`execute`](Tool::execute) runs,
/// so handlers may assume well-formed input.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name of this tool.
    fn name(&self) -> &str;

    /// Human-readable description of what this tool does.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's arguments.
    fn input_schema(&self) -> Value;

    /// Behavioral hints. Defaults to all-false.
    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations::default()
    }

    /// Checks the schema cannot express. Runs before any side effect.
    fn validate(&self, _params: &Value) -> Result<()> {
        Ok(())
    }

    /// Execute with validated arguments.
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolOutput>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Context
// ─────────────────────────────────────────────────────────────────────────────

/// Context provided to tools during execution.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Session the call arrived on, if it came through the transport.
    pub session_id: Option<Uuid>,
    /// Fires when the session closes or the server shuts down.
    pub cancellation: CancellationToken,
}

impl ToolContext {
    /// Context for a call arriving on a session.
    pub fn for_session(session_id: Uuid, cancellation: CancellationToken) -> Self {
        Self {
            session_id: Some(session_id),
            cancellation,
        }
    }

    /// Check if execution has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

impl Default for ToolContext {
    fn default() -> Self {
        Self {
            session_id: None,
            cancellation: CancellationToken::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Output
// ─────────────────────────────────────────────────────────────────────────────

/// Whether a result was served from cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Served from a live cache entry.
    Hit,
    /// Fetched fresh.
    Miss,
}

impl CacheStatus {
    /// `hit` or `miss`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
        }
    }

    /// Whether this is a hit.
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit)
    }
}

/// Successful result of a tool execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// Result payload.
    pub value: Value,
    /// Cache indicator, for cacheable tools.
    pub cache: Option<CacheStatus>,
}

impl ToolOutput {
    /// Output from a non-cached tool.
    pub fn new(value: Value) -> Self {
        Self { value, cache: None }
    }

    /// Output with a cache indicator.
    pub fn with_cache(value: Value, cache: CacheStatus) -> Self {
        Self {
            value,
            cache: Some(cache),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Descriptor
// ─────────────────────────────────────────────────────────────────────────────

/// Static description of a registered tool, as advertised by `tools/list`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    /// Tool name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Argument schema.
    pub input_schema: Value,
    /// Behavioral hints.
    pub annotations: ToolAnnotations,
}

impl ToolDescriptor {
    /// Describe a tool.
    pub fn of(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            input_schema: tool.input_schema(),
            annotations: tool.annotations(),
        }
    }
}

impl From<ToolDescriptor> for ToolInfo {
    fn from(desc: ToolDescriptor) -> Self {
        ToolInfo {
            name: desc.name,
            description: Some(desc.description),
            input_schema: desc.input_schema,
            annotations: Some(desc.annotations),
        }
    }
}
