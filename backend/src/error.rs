//! Transport-level failures.
//!
//! These abort the HTTP exchange with an error status and a JSON-RPC shaped
//! body. Failures of the RPC call itself travel inside a 200 response instead
//! (see [`crate::mcp::handler::Outcome`]).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mcpstream_types::jsonrpc::{INTERNAL_ERROR, INVALID_REQUEST};
use mcpstream_types::{JsonRpcError, JsonRpcResponse};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Origin not allowed: {0}")]
    OriginNotAllowed(String),

    #[error("Invalid JSON-RPC envelope: {0}")]
    InvalidEnvelope(String),

    #[error("Unknown or missing session")]
    SessionNotFound,

    #[error("Accept header must include text/event-stream")]
    EventStreamNotAccepted,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransportError {
    pub fn status(&self) -> StatusCode {
        match self {
            TransportError::OriginNotAllowed(_)
            | TransportError::InvalidEnvelope(_)
            | TransportError::Internal(_) => StatusCode::BAD_REQUEST,
            TransportError::SessionNotFound => StatusCode::NOT_FOUND,
            TransportError::EventStreamNotAccepted => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            TransportError::Internal(_) => INTERNAL_ERROR,
            _ => INVALID_REQUEST,
        }
    }

    /// JSON-RPC body for this error. The request id is unknown at this layer.
    pub fn to_jsonrpc(&self) -> JsonRpcResponse {
        JsonRpcResponse::error(None, JsonRpcError::new(self.code(), self.to_string()))
    }
}

impl IntoResponse for TransportError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.to_jsonrpc())).into_response()
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Internal(err.to_string())
    }
}
