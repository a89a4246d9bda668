//! Uniform result of a dispatched invocation.

use kestrel_mcp::CallToolResult;
use serde_json::{Value, json};

use crate::error::{ErrorKind, ToolError};
use crate::tool::{CacheStatus, ToolOutput};

/// Outcome of [`Dispatcher::invoke`](crate::Dispatcher::invoke).
///
/// Every invocation produces one of these; errors and panics inside tools
/// are folded into [`Envelope::Error`] before reaching the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// The tool returned a payload.
    Success {
        /// Result payload.
        payload: Value,
        /// Cache indicator, for cacheable tools.
        cache: Option<CacheStatus>,
    },
    /// The invocation failed.
    Error {
        /// Client-facing classification.
        kind: ErrorKind,
        /// Human-readable detail.
        message: String,
    },
}

impl Envelope {
    /// Wrap a successful output.
    pub fn success(output: ToolOutput) -> Self {
        Self::Success {
            payload: output.value,
            cache: output.cache,
        }
    }

    /// Wrap a failure.
    pub fn error(err: &ToolError) -> Self {
        Self::Error {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// Whether the invocation succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The error kind, for failures.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Error { kind, .. } => Some(*kind),
        }
    }

    /// The cache indicator, for cached successes.
    pub fn cache(&self) -> Option<CacheStatus> {
        match self {
            Self::Success { cache, .. } => *cache,
            Self::Error { .. } => None,
        }
    }

    /// Short outcome label for logs: `ok` or the error kind.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Success { .. } => "ok",
            Self::Error { kind, .. } => kind.as_str(),
        }
    }

    /// Render into the MCP `tools/call` result shape.
    ///
    /// String payloads are sent as-is; anything else is serialized as JSON.
    /// Errors become `{"error": kind, "message": ..., "retryable": ...}` with
    /// `isError` set.
    pub fn into_call_result(self) -> CallToolResult {
        match self {
            Self::Success { payload, cache } => {
                let text = match payload {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                let result = CallToolResult::text(text);
                match cache {
                    Some(status) => result.with_meta(json!({ "cached": status.is_hit() })),
                    None => result,
                }
            }
            Self::Error { kind, message } => {
                let body = json!({
                    "error": kind.as_str(),
                    "message": message,
                    "retryable": kind.is_retryable(),
                });
                CallToolResult::error(body.to_string())
            }
        }
    }
}
