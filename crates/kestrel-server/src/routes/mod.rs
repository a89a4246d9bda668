//! API routes.

pub mod health;
pub mod messages;
pub mod sse;

pub use health::{health, health_routes};
pub use messages::{MessageQuery, messages_handler};
pub use sse::sse_handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::session::MESSAGES_PATH;
use crate::state::AppState;

/// MCP transport routes: the SSE stream and the message endpoint.
pub fn mcp_routes() -> Router<AppState> {
    Router::new()
        .route("/sse", get(sse_handler))
        .route(MESSAGES_PATH, post(messages_handler))
}
