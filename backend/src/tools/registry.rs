//! Tool registry mapping tool names to descriptors and handlers.

use mcpstream_types::ToolDescriptor;
use std::sync::Arc;

use crate::tools::{builtin, ToolHandler};

/// A tool as stored in the registry.
#[derive(Clone)]
pub struct RegisteredTool {
    pub descriptor: ToolDescriptor,
    pub handler: Arc<dyn ToolHandler>,
}

/// Registry of callable tools, kept in registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in tools.
    pub fn with_builtin_tools() -> Self {
        let mut registry = Self::new();
        for (descriptor, handler) in builtin::get_all_builtin_tools() {
            registry.register(descriptor, handler);
        }
        registry
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&mut self, descriptor: ToolDescriptor, handler: Arc<dyn ToolHandler>) {
        self.tools.retain(|t| t.descriptor.name != descriptor.name);
        self.tools.push(RegisteredTool {
            descriptor,
            handler,
        });
    }

    /// Public descriptors of every tool.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor.clone()).collect()
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.iter().find(|t| t.descriptor.name == name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
