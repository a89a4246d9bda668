//! Transport sessions.
//!
//! Each SSE connection owns one session: an id, a bounded inbound queue, and
//! a worker task that feeds queued messages to the [`MessageHandler`] one at
//! a time and writes replies back to the connection. Messages posted to a
//! session are therefore handled in order; different sessions never wait on
//! each other.
//!
//! The routing table only ever holds live sessions. A session is removed
//! when its connection drops (via [`SessionGuard`]), when its worker stops,
//! or on explicit [`SessionManager::close_session`].

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use kestrel_tools::ToolContext;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::SessionError;

/// Session identifier.
pub type SessionId = Uuid;

/// Path clients post messages to.
pub const MESSAGES_PATH: &str = "/messages";

/// Handles one decoded-from-the-wire message for a session.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Process `raw` and return the serialized reply, or `None` when the
    /// message expects no reply.
    async fn handle(&self, raw: String, ctx: ToolContext) -> Option<String>;
}

/// Something to write to a session's connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Where to post messages. Always the first event.
    Endpoint(String),
    /// A serialized reply.
    Message(String),
}

struct SessionHandle {
    inbound: mpsc::Sender<String>,
    cancel: CancellationToken,
    created_at: DateTime<Utc>,
}

struct Sessions {
    table: Mutex<HashMap<SessionId, SessionHandle>>,
    handler: Arc<dyn MessageHandler>,
    queue_depth: usize,
    shutdown: CancellationToken,
}

impl Sessions {
    fn close(&self, id: SessionId) -> bool {
        let Some(handle) = self.table.lock().remove(&id) else {
            return false;
        };
        handle.cancel.cancel();
        let lifetime_ms = (Utc::now() - handle.created_at).num_milliseconds();
        info!(session_id = %id, lifetime_ms, "Session closed");
        true
    }
}

/// Owns the routing table from session id to session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Sessions>,
}

/// A newly opened session, handed to the connection that owns it.
pub struct OpenedSession {
    /// Session id.
    pub id: SessionId,
    /// Message endpoint embedding the id.
    pub endpoint: String,
    /// Events to write to the connection, starting with the endpoint.
    pub events: mpsc::Receiver<SessionEvent>,
    /// Fires when the session closes or the server shuts down.
    pub cancel: CancellationToken,
    /// Deregisters the session when dropped.
    pub guard: SessionGuard,
}

/// Closes its session on drop.
pub struct SessionGuard {
    id: SessionId,
    sessions: Weak<Sessions>,
}

impl SessionGuard {
    /// The guarded session.
    pub fn id(&self) -> SessionId {
        self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(sessions) = self.sessions.upgrade() {
            sessions.close(self.id);
        }
    }
}

impl SessionManager {
    /// Create a manager. Every session's cancellation token is a child of
    /// `shutdown`.
    pub fn new(
        handler: Arc<dyn MessageHandler>,
        queue_depth: usize,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(Sessions {
                table: Mutex::new(HashMap::new()),
                handler,
                queue_depth: queue_depth.max(1),
                shutdown,
            }),
        }
    }

    /// Allocate a session, register it, and start its worker.
    pub fn open_session(&self) -> OpenedSession {
        let cancel = self.inner.shutdown.child_token();
        let (inbound_tx, inbound_rx) = mpsc::channel(self.inner.queue_depth);
        let (events_tx, events_rx) = mpsc::channel(self.inner.queue_depth + 1);

        let id = {
            let mut table = self.inner.table.lock();
            let id = loop {
                let candidate = Uuid::new_v4();
                if !table.contains_key(&candidate) {
                    break candidate;
                }
            };
            table.insert(
                id,
                SessionHandle {
                    inbound: inbound_tx,
                    cancel: cancel.clone(),
                    created_at: Utc::now(),
                },
            );
            id
        };

        let endpoint = format!("{}?sessionId={}", MESSAGES_PATH, id);
        // Fresh channel with spare capacity.
        let _ = events_tx.try_send(SessionEvent::Endpoint(endpoint.clone()));

        tokio::spawn(run_worker(
            id,
            inbound_rx,
            events_tx,
            Arc::clone(&self.inner.handler),
            cancel.clone(),
            Arc::downgrade(&self.inner),
        ));

        info!(session_id = %id, "Session opened");

        OpenedSession {
            id,
            endpoint,
            events: events_rx,
            cancel,
            guard: SessionGuard {
                id,
                sessions: Arc::downgrade(&self.inner),
            },
        }
    }

    /// Queue `raw` on the session's inbound queue.
    ///
    /// Fails with [`SessionError::NotFound`] for an unknown or closed id and
    /// [`SessionError::Busy`] when the queue is full.
    pub fn route_message(&self, id: SessionId, raw: String) -> Result<(), SessionError> {
        let sent = {
            let table = self.inner.table.lock();
            let handle = table.get(&id).ok_or(SessionError::NotFound(id))?;
            handle.inbound.try_send(raw)
        };

        match sent {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!(session_id = %id, "Session queue full");
                Err(SessionError::Busy(id))
            }
            Err(TrySendError::Closed(_)) => {
                self.close_session(id);
                Err(SessionError::NotFound(id))
            }
        }
    }

    /// Deregister a session and cancel its worker. Returns whether it was
    /// still registered.
    pub fn close_session(&self, id: SessionId) -> bool {
        self.inner.close(id)
    }

    /// Whether `id` is a live session.
    pub fn contains(&self, id: SessionId) -> bool {
        self.inner.table.lock().contains_key(&id)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.inner.table.lock().len()
    }

    /// Whether no sessions are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

async fn run_worker(
    id: SessionId,
    mut inbound: mpsc::Receiver<String>,
    events: mpsc::Sender<SessionEvent>,
    handler: Arc<dyn MessageHandler>,
    cancel: CancellationToken,
    sessions: Weak<Sessions>,
) {
    debug!(session_id = %id, "Session worker started");

    loop {
        let raw = tokio::select! {
            _ = cancel.cancelled() => break,
            raw = inbound.recv() => match raw {
                Some(raw) => raw,
                None => break,
            },
        };

        let ctx = ToolContext::for_session(id, cancel.child_token());
        let reply = match AssertUnwindSafe(handler.handle(raw, ctx))
            .catch_unwind()
            .await
        {
            Ok(reply) => reply,
            Err(_) => {
                error!(session_id = %id, "Message handler panicked");
                break;
            }
        };

        let Some(reply) = reply else {
            continue;
        };

        let delivered = tokio::select! {
            _ = cancel.cancelled() => false,
            sent = events.send(SessionEvent::Message(reply)) => sent.is_ok(),
        };
        if !delivered {
            debug!(session_id = %id, "Connection gone, dropping reply");
            break;
        }
    }

    if let Some(sessions) = sessions.upgrade() {
        sessions.close(id);
    }
    debug!(session_id = %id, "Session worker stopped");
}
