//! Integration tests for the MCP endpoint.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use http_body_util::BodyExt;
use mcpstream::{create_app_with_state, state::AppState};
use mcpstream_types::{PROTOCOL_VERSION, PROTOCOL_VERSION_HEADER, SESSION_ID_HEADER};
use serde_json::{json, Value};
use std::collections::HashSet;
use tower::ServiceExt; // for `oneshot`

const SSE: &str = "application/json, text/event-stream";

/// Helper to create a test app instance sharing `state` with the test.
fn create_test_app() -> (Router, AppState) {
    let state = AppState::default();
    (create_app_with_state(state.clone()), state)
}

fn post() -> axum::http::request::Builder {
    Request::builder()
        .uri("/mcp")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn body_text(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

/// Parse SSE text into `(id, data)` pairs, skipping comments.
fn parse_sse(text: &str) -> Vec<(Option<u64>, Value)> {
    let mut events = Vec::new();
    for block in text.split("\n\n") {
        let mut id = None;
        let mut data = Vec::new();
        for line in block.lines() {
            if let Some(rest) = line.strip_prefix("id:") {
                id = rest.trim().parse().ok();
            } else if let Some(rest) = line.strip_prefix("data:") {
                data.push(rest.trim_start());
            }
        }
        if !data.is_empty() {
            events.push((id, serde_json::from_str(&data.join("\n")).unwrap()));
        }
    }
    events
}

fn rpc(id: u64, method: &str, params: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
}

async fn initialize(app: &Router) -> String {
    let body = rpc(1, "initialize", json!({"protocolVersion": PROTOCOL_VERSION}));
    let response = send(
        app,
        post()
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    response.headers()[SESSION_ID_HEADER]
        .to_str()
        .unwrap()
        .to_string()
}

async fn post_in_session(app: &Router, session: &str, accept: Option<&str>, body: Value) -> Response {
    let mut builder = post().header(SESSION_ID_HEADER, session);
    if let Some(accept) = accept {
        builder = builder.header(header::ACCEPT, accept);
    }
    send(app, builder.body(Body::from(body.to_string())).unwrap()).await
}

#[tokio::test]
async fn test_health_check() {
    let app = mcpstream::create_app();
    let response = send(
        &app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_initialize_returns_json_and_new_session() {
    let (app, state) = create_test_app();
    let body = rpc(1, "initialize", json!({}));

    let mut seen = HashSet::new();
    for _ in 0..3 {
        // SSE is requested but never used for initialize
        let response = send(
            &app,
            post()
                .header(header::ACCEPT, SSE)
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        assert_eq!(response.headers()[PROTOCOL_VERSION_HEADER], PROTOCOL_VERSION);
        let session = response.headers()[SESSION_ID_HEADER]
            .to_str()
            .unwrap()
            .to_string();
        assert!(seen.insert(session), "session id reused");

        let json = body_json(response).await;
        assert_eq!(json["id"], 1);
        assert_eq!(json["result"]["protocolVersion"], PROTOCOL_VERSION);
    }
    assert_eq!(state.sessions().session_count().await, 3);
}

#[tokio::test]
async fn test_notification_is_accepted_with_empty_body() {
    let (app, state) = create_test_app();
    let session = initialize(&app).await;
    let notification = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});

    for accept in [None, Some(SSE), Some("application/json")] {
        let response = post_in_session(&app, &session, accept, notification.clone()).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(response.headers().get(SESSION_ID_HEADER).is_none());
        assert!(body_text(response).await.is_empty());
    }

    let record = state.sessions().get_session(Some(session.as_str())).await.unwrap();
    assert!(record.is_initialized());
}

#[tokio::test]
async fn test_unknown_notification_before_initialized_is_accepted() {
    let (app, _) = create_test_app();
    let session = initialize(&app).await;
    let response = post_in_session(
        &app,
        &session,
        None,
        json!({"jsonrpc": "2.0", "method": "notifications/whatever"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_unknown_tool_is_rpc_error() {
    let (app, _) = create_test_app();
    let session = initialize(&app).await;
    let response = post_in_session(
        &app,
        &session,
        None,
        rpc(2, "tools/call", json!({"name": "frobnicate", "arguments": {}})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["id"], 2);
    assert_eq!(json["error"]["code"], -32601);
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("frobnicate"));
}

#[tokio::test]
async fn test_sum_with_non_array_is_error_result() {
    let (app, _) = create_test_app();
    let session = initialize(&app).await;
    let response = post_in_session(
        &app,
        &session,
        None,
        rpc(3, "tools/call", json!({"name": "sum", "arguments": {"values": "1,2"}})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json.get("error").is_none());
    assert_eq!(json["result"]["isError"], true);
    assert!(json["result"]["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("values must be array"));
}

#[tokio::test]
async fn test_unknown_resource_is_invalid_params() {
    let (app, _) = create_test_app();
    let session = initialize(&app).await;
    let response = post_in_session(
        &app,
        &session,
        None,
        rpc(4, "resources/read", json!({"uri": "docs://missing"})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], -32602);
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("docs://missing"));
}

#[tokio::test]
async fn test_full_session_scenario() {
    let (app, _) = create_test_app();
    let session = initialize(&app).await;

    let response = post_in_session(
        &app,
        &session,
        None,
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = post_in_session(&app, &session, Some(SSE), rpc(2, "tools/list", json!({}))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    assert_eq!(response.headers()[PROTOCOL_VERSION_HEADER], PROTOCOL_VERSION);
    let events = parse_sse(&body_text(response).await);
    assert!(events.len() >= 2);
    let (_, last) = events.last().unwrap();
    assert_eq!(last["id"], 2);
    assert!(last["result"]["nextCursor"].is_null());
    let tools = last["result"]["tools"].as_array().unwrap();
    assert!(tools.iter().any(|t| t["name"] == "echo"));

    let response = post_in_session(
        &app,
        &session,
        None,
        rpc(3, "tools/call", json!({"name": "echo", "arguments": {"text": "hi"}})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json["result"],
        json!({"content": [{"type": "text", "text": "hi"}], "isError": false})
    );
}

#[tokio::test]
async fn test_call_stream_sequence_numbers_increase() {
    let (app, _) = create_test_app();
    let session = initialize(&app).await;

    let mut last = 0;
    for id in 10..13 {
        let response = post_in_session(&app, &session, Some(SSE), rpc(id, "ping", json!({}))).await;
        let events = parse_sse(&body_text(response).await);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].1["method"], "notifications/message");
        assert_eq!(events[1].1["id"], id);
        for (seq, _) in events {
            let seq = seq.expect("every event carries an id");
            assert!(seq > last);
            last = seq;
        }
    }
}

#[tokio::test]
async fn test_requests_without_known_session_are_404() {
    let (app, _) = create_test_app();
    let body = rpc(1, "tools/list", json!({}));

    let response = send(
        &app,
        post()
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = post_in_session(&app, "not-a-session", None, body).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"]["message"], "Unknown or missing session");
}

#[tokio::test]
async fn test_malformed_envelope_is_400() {
    let (app, _) = create_test_app();
    let session = initialize(&app).await;

    for body in ["{not json", r#"{"id":1,"method":"ping"}"#] {
        let response = send(
            &app,
            Request::builder()
                .uri("/mcp")
                .method("POST")
                .header(SESSION_ID_HEADER, &session)
                .body(Body::from(body))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], -32600);
        assert!(json["id"].is_null());
    }
}

#[tokio::test]
async fn test_origin_gatekeeping() {
    let (app, _) = create_test_app();
    let body = rpc(1, "initialize", json!({}));

    let response = send(
        &app,
        post()
            .header(header::ORIGIN, "https://evil.example")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(SESSION_ID_HEADER).is_none());
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], -32600);

    let response = send(
        &app,
        post()
            .header(header::ORIGIN, "http://localhost:5173")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );

    let response = send(
        &app,
        Request::builder()
            .uri("/mcp")
            .header(header::ORIGIN, "https://evil.example")
            .header(header::ACCEPT, "text/event-stream")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_configured_origin_is_admitted() {
    let state = AppState::new(
        mcpstream::tools::ToolRegistry::with_builtin_tools(),
        mcpstream::resources::ResourceStore::with_default_resources(),
        mcpstream::state::TransportSettings {
            allowed_origin: Some("https://app.example.com".to_string()),
            ..Default::default()
        },
    );
    let app = create_app_with_state(state);
    let body = rpc(1, "initialize", json!({}));

    let response = send(
        &app,
        post()
            .header(header::ORIGIN, "https://app.example.com")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_options_preflight() {
    let (app, _) = create_test_app();

    let response = send(
        &app,
        Request::builder()
            .uri("/mcp")
            .method("OPTIONS")
            .header(header::ORIGIN, "http://localhost:3000")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );
    assert!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS]
        .to_str()
        .unwrap()
        .contains("mcp-session-id"));

    let response = send(
        &app,
        Request::builder()
            .uri("/mcp")
            .method("OPTIONS")
            .header(header::ORIGIN, "https://evil.example")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Origin not allowed");
}

#[tokio::test]
async fn test_other_methods_are_405() {
    let (app, _) = create_test_app();
    for method in ["PUT", "DELETE", "PATCH"] {
        let response = send(
            &app,
            Request::builder()
                .uri("/mcp")
                .method(method)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}

fn get_stream(session: Option<&str>, accept: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/mcp").method("GET");
    if let Some(session) = session {
        builder = builder.header(SESSION_ID_HEADER, session);
    }
    if let Some(accept) = accept {
        builder = builder.header(header::ACCEPT, accept);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_get_requires_known_session() {
    let (app, _) = create_test_app();

    for session in [None, Some("unknown")] {
        let response = send(&app, get_stream(session, Some("text/event-stream"))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error"]["message"], "Unknown or missing session");
    }
}

#[tokio::test]
async fn test_get_requires_event_stream_accept() {
    let (app, _) = create_test_app();
    let session = initialize(&app).await;
    let response = send(&app, get_stream(Some(session.as_str()), Some("application/json"))).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

/// Read the next data frame of a live SSE body as text.
async fn next_frame(body: &mut Body) -> String {
    loop {
        let frame = body
            .frame()
            .await
            .expect("stream ended")
            .expect("frame error");
        if let Ok(data) = frame.into_data() {
            return String::from_utf8(data.to_vec()).unwrap();
        }
    }
}

#[tokio::test]
async fn test_push_channel_lifecycle() {
    let (app, state) = create_test_app();
    let session_id = initialize(&app).await;
    let session = state
        .sessions()
        .get_session(Some(session_id.as_str()))
        .await
        .unwrap();

    let response = send(&app, get_stream(Some(session_id.as_str()), Some("text/event-stream"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[PROTOCOL_VERSION_HEADER], PROTOCOL_VERSION);
    let mut body = response.into_body();

    // greeting arrives immediately with the first sequence number
    let greeting = parse_sse(&next_frame(&mut body).await);
    assert_eq!(greeting.len(), 1);
    assert_eq!(greeting[0].0, Some(1));
    assert_eq!(greeting[0].1["method"], "notifications/message");
    assert_eq!(session.subscriber_count(), 1);

    // a concurrent per-call stream draws from the same counter
    let response = post_in_session(&app, &session_id, Some(SSE), rpc(5, "tools/list", json!({}))).await;
    let call_events = parse_sse(&body_text(response).await);
    let call_ids: Vec<_> = call_events.iter().map(|(id, _)| id.unwrap()).collect();
    assert_eq!(call_ids, vec![2, 3]);

    // server-initiated pushes reach the channel with the next sequence number
    let reached = state
        .sessions()
        .notify(
            &session_id,
            json!({"jsonrpc": "2.0", "method": "notifications/resources/list_changed"})
                .to_string(),
        )
        .await
        .unwrap();
    assert_eq!(reached, 1);
    let pushed = parse_sse(&next_frame(&mut body).await);
    assert_eq!(pushed[0].0, Some(4));
    assert_eq!(pushed[0].1["method"], "notifications/resources/list_changed");

    // client disconnects
    drop(body);
    assert_eq!(session.subscriber_count(), 0);
    assert_eq!(
        state
            .sessions()
            .notify(&session_id, "{}".to_string())
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_multiple_push_channels_never_share_sequence() {
    let (app, state) = create_test_app();
    let session_id = initialize(&app).await;

    let mut first = send(&app, get_stream(Some(session_id.as_str()), Some("text/event-stream")))
        .await
        .into_body();
    let mut second = send(&app, get_stream(Some(session_id.as_str()), Some("text/event-stream")))
        .await
        .into_body();

    let a = parse_sse(&next_frame(&mut first).await)[0].0.unwrap();
    let b = parse_sse(&next_frame(&mut second).await)[0].0.unwrap();
    assert_ne!(a, b);

    state
        .sessions()
        .notify(&session_id, json!({"jsonrpc": "2.0", "method": "x"}).to_string())
        .await
        .unwrap();
    let pa = parse_sse(&next_frame(&mut first).await)[0].0.unwrap();
    let pb = parse_sse(&next_frame(&mut second).await)[0].0.unwrap();
    // one push, one sequence number, seen by both channels
    assert_eq!(pa, pb);
    assert!(pa > a.max(b));
}

#[tokio::test]
async fn test_push_channel_sends_keepalive_at_configured_interval() {
    let state = AppState::new(
        mcpstream::tools::ToolRegistry::with_builtin_tools(),
        mcpstream::resources::ResourceStore::with_default_resources(),
        mcpstream::state::TransportSettings {
            keepalive_interval: std::time::Duration::from_millis(50),
            ..Default::default()
        },
    );
    let app = create_app_with_state(state);
    let session_id = initialize(&app).await;

    let mut body = send(&app, get_stream(Some(session_id.as_str()), Some("text/event-stream")))
        .await
        .into_body();
    let greeting = next_frame(&mut body).await;
    assert!(greeting.contains("notifications/message"));

    let frame = tokio::time::timeout(std::time::Duration::from_secs(5), next_frame(&mut body))
        .await
        .expect("no keepalive within timeout");
    assert!(frame.starts_with(": keepalive"), "unexpected frame: {frame:?}");
    assert!(parse_sse(&frame).is_empty());
}
