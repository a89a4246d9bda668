//! Server configuration.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Default capacity of each session's inbound queue.
pub const DEFAULT_SESSION_QUEUE_DEPTH: usize = 64;

/// Default interval between SSE keep-alive comments (15 seconds).
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Default max body size for posted messages (4 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 4 * 1024 * 1024;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Messages a session may have queued before posts are refused with 503.
    pub session_queue_depth: usize,

    /// Interval between keep-alive comments on idle SSE streams.
    pub keep_alive: Duration,

    /// Maximum message body size in bytes.
    pub max_body_size: usize,

    /// Optional usage hints returned from `initialize`.
    pub instructions: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            session_queue_depth: DEFAULT_SESSION_QUEUE_DEPTH,
            keep_alive: DEFAULT_KEEP_ALIVE,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            instructions: None,
        }
    }
}

impl ServerConfig {
    /// Create a server config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive from the `[server]` section of the loaded configuration.
    pub fn from_settings(settings: &kestrel_config::ServerConfig) -> crate::Result<Self> {
        Ok(Self::new()
            .with_bind_address(settings.socket_addr()?)
            .with_session_queue_depth(settings.session_queue_depth)
            .with_keep_alive(settings.keep_alive()))
    }

    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Set the per-session inbound queue capacity. Clamped to at least 1.
    pub fn with_session_queue_depth(mut self, depth: usize) -> Self {
        self.session_queue_depth = depth.max(1);
        self
    }

    /// Set the SSE keep-alive interval.
    pub fn with_keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive = interval;
        self
    }

    /// Set the maximum message body size.
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Set the instructions returned from `initialize`.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(config.session_queue_depth, 64);
        assert_eq!(config.keep_alive, Duration::from_secs(15));
    }

    #[test]
    fn test_from_settings() {
        let settings = kestrel_config::ServerConfig {
            bind: "0.0.0.0:9000".to_string(),
            session_queue_depth: 8,
            keep_alive_secs: 5,
        };
        let config = ServerConfig::from_settings(&settings).unwrap();
        assert_eq!(config.bind_address.port(), 9000);
        assert_eq!(config.session_queue_depth, 8);
        assert_eq!(config.keep_alive, Duration::from_secs(5));
    }

    #[test]
    fn test_from_settings_rejects_bad_bind() {
        let settings = kestrel_config::ServerConfig {
            bind: "not-an-address".to_string(),
            ..Default::default()
        };
        assert!(ServerConfig::from_settings(&settings).is_err());
    }

    #[test]
    fn test_queue_depth_clamped() {
        let config = ServerConfig::new().with_session_queue_depth(0);
        assert_eq!(config.session_queue_depth, 1);
    }
}
