//! Message endpoint.

use axum::{
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde::de::IgnoredAny;
use uuid::Uuid;

use crate::error::{Result, ServerError};
use crate::state::AppState;

/// Query string of `POST /messages`.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    /// Session the message belongs to.
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// Queue a JSON-RPC message on a session.
///
/// Replies arrive on the session's SSE stream, not in this response.
/// Returns 202 once queued, 400 for a missing or malformed session id or
/// body, 404 for an unknown or closed session, and 503 when the session's
/// queue is full.
pub async fn messages_handler(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> Result<StatusCode> {
    let raw_id = query
        .session_id
        .ok_or_else(|| ServerError::BadRequest("missing sessionId".to_string()))?;
    let id = Uuid::parse_str(&raw_id)
        .map_err(|_| ServerError::BadRequest(format!("invalid sessionId '{}'", raw_id)))?;

    serde_json::from_str::<IgnoredAny>(&body)
        .map_err(|e| ServerError::BadRequest(format!("malformed JSON: {}", e)))?;

    state.sessions.route_message(id, body)?;
    Ok(StatusCode::ACCEPTED)
}
