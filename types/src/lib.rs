//! Shared wire types for the mcpstream transport.
//!
//! This crate contains the JSON-RPC envelope and the MCP method payloads
//! used by the server and by its integration tests.

/// Default port for the mcpstream server.
pub const DEFAULT_PORT: u16 = 3000;

/// MCP protocol revision spoken by the server.
pub const PROTOCOL_VERSION: &str = "2025-06-18";

/// Header carrying the session token.
pub const SESSION_ID_HEADER: &str = "mcp-session-id";

/// Header carrying the negotiated protocol revision.
pub const PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";

pub mod jsonrpc;
pub mod mcp;

// Re-export commonly used types
pub use jsonrpc::{
    JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    JsonRpcServerNotification, RequestId,
};
pub use mcp::{
    CallToolParams, CallToolResult, Content, Implementation, InitializeResult, ListResourcesResult,
    ListToolsResult, LoggingLevel, LoggingMessageParams, ReadResourceParams, ReadResourceResult,
    ResourceContents, ResourceDescriptor, ServerCapabilities, ToolDescriptor,
};
