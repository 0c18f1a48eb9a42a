//! MCP session management.
//!
//! Sessions are identified by random UUIDs handed out on `initialize`.
//! Each session owns a sequence counter shared by every SSE stream opened on
//! it, plus the set of push channels currently subscribed to it.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::TransportError;

/// A payload stamped with its session sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencedEvent {
    pub sequence: u64,
    pub payload: String,
}

/// Identifies one open push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sender half of a push channel.
pub type SubscriberTx = mpsc::UnboundedSender<SequencedEvent>;

#[derive(Debug, Default)]
struct SessionState {
    initialized: bool,
    cursor: u64,
    subscribers: HashMap<SubscriberId, SubscriberTx>,
}

/// An MCP session.
#[derive(Debug)]
pub struct McpSession {
    id: String,
    state: Mutex<SessionState>,
}

impl McpSession {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    /// Set the initialized flag. Returns `true` if it was not already set.
    pub fn mark_initialized(&self) -> bool {
        let mut state = self.state.lock();
        let changed = !state.initialized;
        state.initialized = true;
        if changed {
            debug!("MCP session {} marked as initialized", self.id);
        }
        changed
    }

    /// Pre-increment the cursor and return the new value.
    pub fn next_sequence(&self) -> u64 {
        let mut state = self.state.lock();
        state.cursor += 1;
        state.cursor
    }

    /// Stamp a payload with the next sequence number.
    pub fn sequence(&self, payload: String) -> SequencedEvent {
        SequencedEvent {
            sequence: self.next_sequence(),
            payload,
        }
    }

    pub fn add_subscriber(&self, id: SubscriberId, tx: SubscriberTx) {
        self.state.lock().subscribers.insert(id, tx);
    }

    /// Returns `true` if the subscriber was still registered.
    pub fn remove_subscriber(&self, id: SubscriberId) -> bool {
        self.state.lock().subscribers.remove(&id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    /// Push a server-initiated message to every open push channel.
    ///
    /// Sequencing and fan-out happen under one lock, so every channel sees
    /// pushes in sequence order. Returns the number of channels reached.
    pub fn notify(&self, payload: String) -> usize {
        let mut state = self.state.lock();
        if state.subscribers.is_empty() {
            return 0;
        }
        state.cursor += 1;
        let event = SequencedEvent {
            sequence: state.cursor,
            payload,
        };
        // receivers dropped before their guard ran are pruned here
        state
            .subscribers
            .retain(|_, tx| tx.send(event.clone()).is_ok());
        state.subscribers.len()
    }
}

/// Manager for MCP sessions.
///
/// Sessions are never evicted; they live until the process exits.
#[derive(Clone, Default)]
pub struct McpSessionManager {
    sessions: Arc<RwLock<HashMap<String, Arc<McpSession>>>>,
    next_subscriber: Arc<AtomicU64>,
}

impl McpSessionManager {
    /// Create a new session manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and store a fresh session.
    pub async fn create_session(&self) -> Arc<McpSession> {
        let session = Arc::new(McpSession::new());
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id.clone(), session.clone());
        info!("Created MCP session: {}", session.id);
        session
    }

    /// Look up a session. An absent id is treated like an unknown one.
    pub async fn get_session(&self, id: Option<&str>) -> Result<Arc<McpSession>, TransportError> {
        let id = id.ok_or(TransportError::SessionNotFound)?;
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .cloned()
            .ok_or(TransportError::SessionNotFound)
    }

    /// Send a server-initiated message to a session's push channels.
    pub async fn notify(&self, id: &str, payload: String) -> Result<usize, TransportError> {
        let session = self.get_session(Some(id)).await?;
        Ok(session.notify(payload))
    }

    /// Allocate a handle for a new push channel.
    pub fn next_subscriber_id(&self) -> SubscriberId {
        SubscriberId(self.next_subscriber.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the number of sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
