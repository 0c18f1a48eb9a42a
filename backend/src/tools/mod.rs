//! Capability registry: the tools a session can call.

pub mod builtin;
pub mod registry;

pub use registry::ToolRegistry;

use async_trait::async_trait;
use mcpstream_types::Content;
use serde_json::Value;

/// Error raised by a tool while executing.
///
/// These never become JSON-RPC errors; the router folds them into a
/// successful `tools/call` result with `isError: true`.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Failed(String),
}

/// Executable side of a tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool with the caller's `arguments` (an empty object when omitted).
    async fn call(&self, arguments: Value) -> Result<Vec<Content>, ToolError>;
}
