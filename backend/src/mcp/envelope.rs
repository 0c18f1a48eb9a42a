//! JSON-RPC envelope parsing and classification.

use mcpstream_types::jsonrpc::JSONRPC_VERSION;
use mcpstream_types::{JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, RequestId};
use serde_json::Value;

use crate::error::TransportError;

/// Parse a POST body into a classified JSON-RPC message.
///
/// A non-null `id` together with a string `method` makes a request. Everything
/// else that carries `"jsonrpc": "2.0"` is a notification, including responses
/// sent by the client, which get an empty method and are acknowledged as no-ops.
pub fn classify(body: &[u8]) -> Result<JsonRpcMessage, TransportError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| TransportError::InvalidEnvelope(format!("parse error: {}", e)))?;

    let object = value
        .as_object()
        .ok_or_else(|| TransportError::InvalidEnvelope("expected a JSON object".to_string()))?;

    if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(TransportError::InvalidEnvelope(
            "missing or invalid jsonrpc version".to_string(),
        ));
    }

    let id = match object.get("id") {
        None | Some(Value::Null) => None,
        Some(raw) => Some(parse_id(raw)?),
    };

    let params = match object.get("params") {
        None | Some(Value::Null) => None,
        Some(p @ (Value::Object(_) | Value::Array(_))) => Some(p.clone()),
        Some(_) => {
            return Err(TransportError::InvalidEnvelope(
                "params must be an object or an array".to_string(),
            ))
        }
    };

    let method = object.get("method").and_then(Value::as_str);

    Ok(match (id, method) {
        (Some(id), Some(method)) => JsonRpcMessage::Request(JsonRpcRequest {
            id,
            method: method.to_string(),
            params,
        }),
        (_, method) => JsonRpcMessage::Notification(JsonRpcNotification {
            method: method.unwrap_or_default().to_string(),
            params,
        }),
    })
}

/// Ids are strings or integers.
fn parse_id(value: &Value) -> Result<RequestId, TransportError> {
    match value {
        Value::String(s) => Ok(RequestId::String(s.clone())),
        Value::Number(n) => n
            .as_i64()
            .map(RequestId::Number)
            .ok_or_else(|| TransportError::InvalidEnvelope("id must be an integer".to_string())),
        _ => Err(TransportError::InvalidEnvelope(
            "id must be a string or a number".to_string(),
        )),
    }
}

/// Whether an Accept header value declares SSE support.
pub fn accepts_event_stream(accept: Option<&str>) -> bool {
    accept
        .map(|value| {
            value
                .split(',')
                .any(|part| part.trim().starts_with("text/event-stream"))
        })
        .unwrap_or(false)
}
