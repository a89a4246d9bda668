//! Error types for the server.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Service unavailable.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Tool registration failed during startup.
    #[error("Registry error: {0}")]
    Registry(#[from] kestrel_tools::RegistryError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<kestrel_config::ConfigError> for ServerError {
    fn from(e: kestrel_config::ConfigError) -> Self {
        ServerError::Config(e.to_string())
    }
}

impl From<kestrel_cache::Error> for ServerError {
    fn from(e: kestrel_cache::Error) -> Self {
        ServerError::Config(e.to_string())
    }
}

impl From<SessionError> for ServerError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound(_) => ServerError::NotFound(e.to_string()),
            SessionError::Busy(_) => ServerError::ServiceUnavailable(e.to_string()),
        }
    }
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Failure to deliver a message to a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The id was never issued, or its connection has closed.
    #[error("session not found: {0}")]
    NotFound(Uuid),

    /// The session's inbound queue is full.
    #[error("session {0} is busy, retry later")]
    Busy(Uuid),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ServerError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
            }
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            ServerError::Registry(_) => (StatusCode::INTERNAL_SERVER_ERROR, "registry_error"),
            ServerError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Server error");
        } else {
            tracing::warn!(error = %self, code, "Client error");
        }

        let body = ErrorResponse {
            code: code.to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
