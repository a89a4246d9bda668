//! MCP-over-SSE server for Kestrel.
//!
//! This crate provides the network transport for the gateway's tools.
//!
//! # Endpoints
//!
//! - `GET /sse` opens a session. The first event (`endpoint`) names the
//!   path to post messages to; replies arrive as `message` events.
//! - `POST /messages?sessionId=<id>` queues a JSON-RPC message on a session
//!   and returns `202 Accepted`.
//! - `GET /health` reports configuration completeness and cache statistics.
//!
//! # Example
//!
//! ```ignore
//! use kestrel_server::{Gateway, Server, ServerConfig};
//!
//! let loaded = kestrel_config::load_config(None)?;
//! let gateway = Gateway::from_config(&loaded.config, upstream)?;
//! let config = ServerConfig::from_settings(&loaded.config.server)?;
//!
//! let server = Server::new(gateway, config, shutdown.clone());
//! server.run().await?;
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod health;
pub mod routes;
pub mod rpc;
pub mod session;
pub mod state;

pub use config::ServerConfig;
pub use error::{Result, ServerError, SessionError};
pub use gateway::Gateway;
pub use health::{HealthCheckTool, HealthReport, HealthReporter, HealthStatus, ReportFreshness};
pub use rpc::RpcRouter;
pub use session::{MessageHandler, OpenedSession, SessionEvent, SessionGuard, SessionManager};
pub use state::AppState;

use std::net::SocketAddr;

use axum::{Router, extract::DefaultBodyLimit};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The Kestrel HTTP server.
pub struct Server {
    /// Application state.
    state: AppState,
}

impl Server {
    /// Create a server from an assembled gateway.
    pub fn new(gateway: Gateway, config: ServerConfig, shutdown: CancellationToken) -> Self {
        Self {
            state: gateway.into_state(config, shutdown),
        }
    }

    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// The shared application state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        Router::new()
            .merge(routes::health_routes())
            .merge(routes::mcp_routes())
            .layer(DefaultBodyLimit::max(self.state.config.max_body_size))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the server on the configured address until shutdown.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address;
        self.run_on(addr).await
    }

    /// Run the server on a specific address until shutdown.
    pub async fn run_on(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind {}: {}", addr, e)))?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener until the shutdown token fires.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let addr = listener
            .local_addr()
            .map_err(|e| ServerError::Internal(format!("Failed to read local address: {}", e)))?;
        info!("Starting server on {}", addr);

        let shutdown = self.state.shutdown.clone();
        let router = self.router();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        info!("Server stopped");
        Ok(())
    }
}
