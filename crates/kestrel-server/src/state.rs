//! Application state shared across handlers.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::health::HealthReporter;
use crate::session::SessionManager;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Live transport sessions.
    pub sessions: SessionManager,

    /// Health reporter.
    pub health: Arc<HealthReporter>,

    /// Cancelled on shutdown. Ends open SSE streams and session workers.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        config: ServerConfig,
        sessions: SessionManager,
        health: Arc<HealthReporter>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config: Arc::new(config),
            sessions,
            health,
            shutdown,
        }
    }
}
