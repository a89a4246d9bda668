//! SSE session stream.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use tracing::debug;

use crate::session::{OpenedSession, SessionEvent};
use crate::state::AppState;

/// Open a session and stream its events.
///
/// The first event is `endpoint`, carrying the path to post messages to.
/// Every reply follows as a `message` event. The session closes when the
/// client disconnects or the server shuts down.
pub async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let OpenedSession {
        id,
        mut events,
        cancel,
        guard,
        ..
    } = state.sessions.open_session();

    let stream = async_stream::stream! {
        let _guard = guard;

        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => None,
                event = events.recv() => event,
            };
            let Some(event) = event else {
                break;
            };
            yield Ok(to_sse(event));
        }

        debug!(session_id = %id, "SSE stream ended");
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(state.config.keep_alive))
}

fn to_sse(event: SessionEvent) -> Event {
    match event {
        SessionEvent::Endpoint(path) => Event::default().event("endpoint").data(path),
        SessionEvent::Message(json) => Event::default().event("message").data(json),
    }
}
