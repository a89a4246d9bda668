//! External data providers.
//!
//! Tools reach providers only through the [`Upstream`] trait: "invoke a
//! remote operation, get a value or a failure". [`HttpUpstream`] is the
//! production implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::UpstreamError;

/// A remote data provider.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Provider name, for logs and error messages.
    fn name(&self) -> &str;

    /// Invoke a named remote operation.
    async fn invoke(&self, operation: &str, params: Value) -> Result<Value, UpstreamError>;
}

/// Configuration for [`HttpUpstream`].
#[derive(Clone)]
pub struct HttpUpstreamConfig {
    /// Provider name.
    pub name: String,
    /// Base URL; operations are appended as path segments.
    pub base_url: Url,
    /// Bearer token. Calls fail with `MissingCredentials` without one.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for HttpUpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpUpstreamConfig")
            .field("name", &self.name)
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Provider reached over HTTP: `POST {base_url}/{operation}` with a JSON
/// body and bearer authentication.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: Client,
    config: HttpUpstreamConfig,
}

impl HttpUpstream {
    /// Build the HTTP client.
    pub fn new(config: HttpUpstreamConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| UpstreamError::Transport {
                operation: "client setup".to_string(),
                message: e.without_url().to_string(),
            })?;

        Ok(Self { client, config })
    }

    /// The configuration.
    pub fn config(&self) -> &HttpUpstreamConfig {
        &self.config
    }

    fn endpoint(&self, operation: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.as_str().trim_end_matches('/'),
            operation.trim_start_matches('/')
        )
    }

    fn map_send_error(&self, operation: &str, err: reqwest::Error) -> UpstreamError {
        if err.is_timeout() {
            UpstreamError::Timeout {
                operation: operation.to_string(),
                after: self.config.timeout,
            }
        } else {
            UpstreamError::Transport {
                operation: operation.to_string(),
                message: err.without_url().to_string(),
            }
        }
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn invoke(&self, operation: &str, params: Value) -> Result<Value, UpstreamError> {
        let api_key =
            self.config
                .api_key
                .as_deref()
                .ok_or_else(|| UpstreamError::MissingCredentials {
                    provider: self.config.name.clone(),
                })?;

        debug!(provider = %self.config.name, operation, "Calling upstream");

        let response = self
            .client
            .post(self.endpoint(operation))
            .bearer_auth(api_key)
            .json(&params)
            .send()
            .await
            .map_err(|e| self.map_send_error(operation, e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            return Err(UpstreamError::RateLimited {
                operation: operation.to_string(),
                retry_after,
            });
        }
        if !status.is_success() {
            return Err(UpstreamError::Status {
                operation: operation.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                self.map_send_error(operation, e)
            } else {
                UpstreamError::Decode {
                    operation: operation.to_string(),
                    message: e.without_url().to_string(),
                }
            }
        })
    }
}
