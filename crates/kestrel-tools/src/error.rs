//! Error types for tool registration and execution.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::params::ParameterValidationError;

/// Result type for tool execution.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Client-facing classification of a failed invocation.
///
/// Lets a caller tell "fix your input" from "retry later" from "server
/// defect" without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Arguments are missing or malformed.
    #[serde(rename = "validation_error")]
    Validation,
    /// No tool with the requested name.
    #[serde(rename = "not_found")]
    NotFound,
    /// The external provider failed. Retrying may help.
    #[serde(rename = "upstream_error")]
    Upstream,
    /// Unexpected failure inside the server.
    #[serde(rename = "internal_error")]
    Internal,
}

impl ErrorKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation_error",
            Self::NotFound => "not_found",
            Self::Upstream => "upstream_error",
            Self::Internal => "internal_error",
        }
    }

    /// Whether the same call may succeed if repeated unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised while validating or executing a tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments failed schema or tool-specific validation.
    #[error("{0}")]
    Validation(String),

    /// No tool is registered under this name.
    #[error("unknown tool '{0}'")]
    NotFound(String),

    /// The upstream provider failed.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// Unexpected failure in a handler.
    #[error("{0}")]
    Internal(String),
}

impl ToolError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// The client-facing kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Upstream(_) => ErrorKind::Upstream,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the same call may succeed if repeated unchanged.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

impl From<ParameterValidationError> for ToolError {
    fn from(err: ParameterValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("serialization failed: {}", err))
    }
}

/// Failure talking to an external provider.
///
/// Messages carry the operation name and status, never request URLs or
/// credentials.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// No API key is configured for the provider.
    #[error("{provider} has no API key configured")]
    MissingCredentials {
        /// Provider name.
        provider: String,
    },

    /// The call did not complete within its deadline.
    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout {
        /// Upstream operation.
        operation: String,
        /// Deadline that elapsed.
        after: Duration,
    },

    /// The provider refused the call for exceeding its rate limit.
    #[error("{operation} was rate limited by the provider")]
    RateLimited {
        /// Upstream operation.
        operation: String,
        /// Seconds the provider asked us to wait, when given.
        retry_after: Option<u64>,
    },

    /// The provider answered with a non-success status.
    #[error("{operation} failed with status {status}")]
    Status {
        /// Upstream operation.
        operation: String,
        /// HTTP status code.
        status: u16,
    },

    /// The request could not be sent or the connection failed.
    #[error("{operation} transport failure: {message}")]
    Transport {
        /// Upstream operation.
        operation: String,
        /// Failure description without the request URL.
        message: String,
    },

    /// The provider's response body was not valid JSON.
    #[error("{operation} returned an unreadable response: {message}")]
    Decode {
        /// Upstream operation.
        operation: String,
        /// Decode failure.
        message: String,
    },

    /// The session that issued the call went away before it finished.
    #[error("{operation} was cancelled")]
    Cancelled {
        /// Upstream operation.
        operation: String,
    },
}

/// Error raised while assembling the tool registry at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two tools were registered under the same name.
    #[error("tool '{0}' is already registered")]
    Duplicate(String),

    /// Only tools annotated idempotent may have their results cached.
    #[error("tool '{0}' is not annotated idempotent and cannot be cached")]
    NotIdempotent(String),

    /// The tool's input schema is not a valid JSON Schema.
    #[error("tool '{tool}' has an invalid input schema: {message}")]
    InvalidSchema {
        /// Tool name.
        tool: String,
        /// Compilation failure.
        message: String,
    },
}
