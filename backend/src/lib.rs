//! mcpstream server library.
//!
//! This module exposes the application builder for use in tests.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod origin;
pub mod resources;
pub mod state;
pub mod tools;

use state::AppState;

/// Create the Axum application router with the default state.
pub fn create_app() -> Router {
    create_app_with_state(AppState::default())
}

/// Create the Axum application router with a given state.
///
/// The MCP endpoint answers `OPTIONS`, `GET` and `POST`; any other method on
/// it gets 405.
pub fn create_app_with_state(state: AppState) -> Router {
    let endpoint = state.endpoint_path().to_string();

    Router::new()
        .route("/health", get(health))
        .route(
            &endpoint,
            get(api::mcp::mcp_get)
                .post(api::mcp::mcp_post)
                .options(api::mcp::mcp_options),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "OK"
}
