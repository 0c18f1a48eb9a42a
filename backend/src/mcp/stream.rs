//! SSE streams for MCP sessions.
//!
//! Two kinds of stream share a session's sequence counter:
//! - per-call streams answering a single POST, closed after the response event
//! - push channels opened by GET, alive until the client disconnects

use axum::response::sse::Event;
use futures::stream::{BoxStream, Stream, StreamExt};
use mcpstream_types::jsonrpc::INTERNAL_ERROR;
use mcpstream_types::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, JsonRpcServerNotification, LoggingLevel,
    LoggingMessageParams,
};
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, info};

use crate::mcp::handler::{McpHandler, SERVER_NAME};
use crate::mcp::session::{McpSession, McpSessionManager, SequencedEvent, SubscriberId};
use crate::state::AppState;

/// Text of the keepalive comment line.
pub const KEEPALIVE_TEXT: &str = "keepalive";

/// Stream item type handed to axum's `Sse`.
pub type SseStream = BoxStream<'static, Result<Event, Infallible>>;

impl SequencedEvent {
    /// Render as an SSE event: `id: <sequence>` then `data: <json>`.
    pub fn into_event(self) -> Event {
        Event::default()
            .id(self.sequence.to_string())
            .data(self.payload)
    }
}

/// Serialize an outgoing message.
///
/// A message that cannot be serialized is replaced by a -32603 error so the
/// event still carries valid JSON-RPC.
fn encode<T: Serialize>(message: &T) -> String {
    match serde_json::to_string(message) {
        Ok(payload) => payload,
        Err(e) => {
            error!("MCP: Failed to serialize outgoing message: {}", e);
            json!({
                "jsonrpc": "2.0",
                "id": null,
                "error": { "code": INTERNAL_ERROR, "message": e.to_string() },
            })
            .to_string()
        }
    }
}

/// A `notifications/message` log notification.
pub fn log_notification(level: LoggingLevel, data: serde_json::Value) -> String {
    let params = LoggingMessageParams {
        level,
        logger: Some(SERVER_NAME.to_string()),
        data,
    };
    let params = serde_json::to_value(params).unwrap_or_else(|e| {
        error!("MCP: Failed to serialize log notification params: {}", e);
        serde_json::Value::Null
    });
    encode(&JsonRpcServerNotification::new("notifications/message", params))
}

/// Stream answering one request.
///
/// The request runs on its own task, which emits a log notification
/// announcing the call, then computes the outcome and emits the response.
/// Each event takes the session's next sequence number at the moment it is
/// emitted. The stream only reads the task's output, so a client that
/// disconnects loses the remaining events but never aborts the request.
pub fn call_stream(state: AppState, session: Arc<McpSession>, request: JsonRpcRequest) -> SseStream {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let announce = log_notification(
            LoggingLevel::Info,
            json!({ "message": format!("Processing {}", request.method) }),
        );
        let _ = tx.send(session.sequence(announce));

        let id = request.id.clone();
        let response = match McpHandler::dispatch(
            &state,
            &session,
            &request.method,
            request.params.as_ref(),
        )
        .await
        {
            Ok(outcome) => outcome.into_response(id),
            // the stream is already open, so the failure travels as an RPC error
            Err(e) => JsonRpcResponse::error(Some(id), JsonRpcError::new(INTERNAL_ERROR, e.to_string())),
        };

        if tx.send(session.sequence(encode(&response))).is_ok() {
            debug!(
                "MCP: Streaming response for {} on session {}",
                request.method,
                session.id()
            );
        } else {
            debug!(
                "MCP: Client left before response to {} on session {}",
                request.method,
                session.id()
            );
        }
    });

    UnboundedReceiverStream::new(rx)
        .map(|event| Ok(event.into_event()))
        .boxed()
}

/// Removes a push channel from its session when dropped.
struct SubscriptionGuard {
    session: Arc<McpSession>,
    id: SubscriberId,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if self.session.remove_subscriber(self.id) {
            info!(
                "MCP: Push channel {} closed for session {}",
                self.id,
                self.session.id()
            );
        }
    }
}

/// Long-lived stream behind `GET`.
///
/// Owns its subscription: when the response body is dropped on disconnect,
/// the session stops routing pushes to it.
pub struct PushChannel {
    events: UnboundedReceiverStream<SequencedEvent>,
    _guard: SubscriptionGuard,
}

impl PushChannel {
    /// Open a push channel on `session`.
    ///
    /// The greeting notification is queued before the channel is registered,
    /// so it is always the first event the client sees.
    pub fn open(sessions: &McpSessionManager, session: Arc<McpSession>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = sessions.next_subscriber_id();

        let greeting = log_notification(
            LoggingLevel::Info,
            json!({ "message": "Push channel open", "sessionId": session.id() }),
        );
        // the receiver is alive, so this cannot fail
        let _ = tx.send(session.sequence(greeting));

        session.add_subscriber(id, tx);
        info!(
            "MCP: Push channel {} opened for session {} ({} open)",
            id,
            session.id(),
            session.subscriber_count()
        );

        Self {
            events: UnboundedReceiverStream::new(rx),
            _guard: SubscriptionGuard { session, id },
        }
    }
}

impl Stream for PushChannel {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events
            .poll_next_unpin(cx)
            .map(|event| event.map(|e| Ok(e.into_event())))
    }
}
