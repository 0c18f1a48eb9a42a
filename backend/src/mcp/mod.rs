//! MCP (Model Context Protocol) Streamable HTTP support.
//!
//! This module implements the session, dispatch and streaming core of the
//! Streamable HTTP transport. The axum endpoint handlers live in
//! [`crate::api::mcp`].
//!
//! ## Session Management
//!
//! Sessions are identified by the `Mcp-Session-Id` header, assigned during
//! initialization and required for subsequent requests.
//!
//! ## Streaming
//!
//! Every SSE event carries an `id:` taken from its session's sequence counter,
//! whichever stream emitted it.

pub mod envelope;
pub mod handler;
pub mod session;
pub mod stream;

pub use handler::{McpHandler, Outcome};
pub use session::{McpSession, McpSessionManager};
