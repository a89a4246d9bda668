//! Health check endpoint.

use axum::{Json, Router, extract::State, routing::get};

use crate::health::HealthReport;
use crate::state::AppState;

/// Current health report. Never calls upstream providers.
pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.health.report())
}

/// Create health check routes.
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
