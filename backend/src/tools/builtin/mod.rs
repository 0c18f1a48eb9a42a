//! Built-in tools shipped with the server.

pub mod echo;
pub mod sum;

use mcpstream_types::ToolDescriptor;
use std::sync::Arc;

use crate::tools::ToolHandler;

/// Get all built-in tools with their handlers.
pub fn get_all_builtin_tools() -> Vec<(ToolDescriptor, Arc<dyn ToolHandler>)> {
    vec![
        (echo::descriptor(), Arc::new(echo::EchoTool)),
        (sum::descriptor(), Arc::new(sum::SumTool)),
    ]
}
