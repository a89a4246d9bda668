//! Error types for MCP message handling.

use thiserror::Error;

use crate::protocol::JsonRpcError;

/// Result type for MCP operations.
pub type Result<T> = std::result::Result<T, McpError>;

/// Error type for decoding and validating inbound MCP messages.
#[derive(Debug, Error)]
pub enum McpError {
    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The message parsed as JSON but is not a valid JSON-RPC 2.0 request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Request parameters are missing or malformed.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// The requested method is not implemented.
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// The server failed while producing a response.
    #[error("internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// Create an invalid request error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create an invalid params error.
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }

    /// Map to the JSON-RPC error object sent back to the client.
    pub fn to_rpc_error(&self) -> JsonRpcError {
        let code = match self {
            Self::Json(_) => JsonRpcError::PARSE_ERROR,
            Self::InvalidRequest(_) => JsonRpcError::INVALID_REQUEST,
            Self::InvalidParams(_) => JsonRpcError::INVALID_PARAMS,
            Self::MethodNotFound(_) => JsonRpcError::METHOD_NOT_FOUND,
            Self::Internal(_) => JsonRpcError::INTERNAL_ERROR,
        };
        JsonRpcError::new(code, self.to_string())
    }
}
