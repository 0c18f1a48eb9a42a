//! MCP Streamable HTTP endpoint handlers.
//!
//! ## Endpoints
//!
//! - `POST /mcp` - Send one JSON-RPC message (answered as JSON, 202 or SSE)
//! - `GET /mcp` - Open the push channel for server-initiated messages
//! - `OPTIONS /mcp` - CORS preflight
//!
//! Every exchange passes the origin check first. Any other method gets 405
//! from the router.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{
        sse::{KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use mcpstream_types::{JsonRpcMessage, JsonRpcResponse, SESSION_ID_HEADER};
use tracing::{debug, info, warn};

use crate::api::headers::ResponseHeaders;
use crate::error::TransportError;
use crate::mcp::envelope::{accepts_event_stream, classify};
use crate::mcp::stream::{call_stream, PushChannel, SseStream, KEEPALIVE_TEXT};
use crate::mcp::McpHandler;
use crate::state::AppState;

/// Extract session ID from headers.
fn get_session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
}

fn wants_event_stream(headers: &HeaderMap) -> bool {
    accepts_event_stream(headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()))
}

/// How a POST is answered.
enum Delivery {
    /// One JSON body, status 200. Carries the session id when one was just created.
    Json(JsonRpcResponse, Option<String>),
    /// Notification accepted, empty body.
    Accepted,
    /// Per-call SSE stream.
    Stream(SseStream),
}

impl Delivery {
    fn into_response(self, headers: ResponseHeaders) -> Response {
        match self {
            Delivery::Json(body, session_id) => {
                let headers = match session_id {
                    Some(id) => headers.session_id(&id),
                    None => headers,
                };
                headers.apply((StatusCode::OK, Json(body)).into_response())
            }
            Delivery::Accepted => headers.apply(StatusCode::ACCEPTED.into_response()),
            Delivery::Stream(stream) => headers.apply(Sse::new(stream).into_response()),
        }
    }
}

/// OPTIONS /mcp - CORS preflight.
pub async fn mcp_options(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match state.origin_policy().check(&headers) {
        Ok(origin) => ResponseHeaders::new()
            .cors(origin.as_deref())
            .preflight()
            .apply(StatusCode::NO_CONTENT.into_response()),
        Err(_) => (StatusCode::BAD_REQUEST, "Origin not allowed").into_response(),
    }
}

/// POST /mcp - Handle one JSON-RPC message.
///
/// The `Mcp-Session-Id` header is assigned on initialize and required for
/// every other message.
pub async fn mcp_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let origin = match state.origin_policy().check(&headers) {
        Ok(origin) => origin,
        Err(e) => return ResponseHeaders::new().apply(e.into_response()),
    };
    let response_headers = ResponseHeaders::new().cors(origin.as_deref());

    match select_delivery(&state, &headers, &body).await {
        Ok(delivery) => delivery.into_response(response_headers),
        Err(e) => {
            debug!("MCP POST rejected: {}", e);
            response_headers.apply(e.into_response())
        }
    }
}

/// Classify, route and choose how to deliver one POSTed message.
async fn select_delivery(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Delivery, TransportError> {
    let message = classify(body)?;
    let session_id = get_session_id(headers);
    debug!(
        "MCP POST: method={}, session={:?}",
        message.method(),
        session_id
    );

    // initialize creates the session and is never streamed
    if let JsonRpcMessage::Request(request) = &message {
        if request.method == "initialize" {
            let session = state.sessions().create_session().await;
            let outcome =
                McpHandler::dispatch(state, &session, &request.method, request.params.as_ref())
                    .await?;
            info!("MCP: New session initialized: {}", session.id());
            return Ok(Delivery::Json(
                outcome.into_response(request.id.clone()),
                Some(session.id().to_string()),
            ));
        }
    }

    let session = state.sessions().get_session(session_id).await?;

    match message {
        JsonRpcMessage::Notification(notification) => {
            McpHandler::dispatch(
                state,
                &session,
                &notification.method,
                notification.params.as_ref(),
            )
            .await?;
            Ok(Delivery::Accepted)
        }
        JsonRpcMessage::Request(request) if wants_event_stream(headers) => Ok(Delivery::Stream(
            call_stream(state.clone(), session, request),
        )),
        JsonRpcMessage::Request(request) => {
            let outcome =
                McpHandler::dispatch(state, &session, &request.method, request.params.as_ref())
                    .await?;
            Ok(Delivery::Json(outcome.into_response(request.id), None))
        }
    }
}

/// GET /mcp - Open the push channel for a session.
///
/// The channel stays open until the client disconnects, with a comment
/// keepalive at the configured interval.
pub async fn mcp_get(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let origin = match state.origin_policy().check(&headers) {
        Ok(origin) => origin,
        Err(e) => return ResponseHeaders::new().apply(e.into_response()),
    };
    let response_headers = ResponseHeaders::new().cors(origin.as_deref());

    if !wants_event_stream(&headers) {
        warn!("MCP GET without text/event-stream in Accept");
        return response_headers.apply(TransportError::EventStreamNotAccepted.into_response());
    }

    let session = match state.sessions().get_session(get_session_id(&headers)).await {
        Ok(session) => session,
        Err(e) => return response_headers.apply(e.into_response()),
    };

    let channel = PushChannel::open(state.sessions(), session);
    let sse = Sse::new(channel).keep_alive(
        KeepAlive::new()
            .interval(state.keepalive_interval())
            .text(KEEPALIVE_TEXT),
    );
    response_headers.apply(sse.into_response())
}
