//! In-memory resource store.

use mcpstream_types::{ResourceContents, ResourceDescriptor};

#[derive(Debug, Clone)]
struct StoredResource {
    descriptor: ResourceDescriptor,
    text: String,
}

/// Maps resource uris to descriptors and text content.
#[derive(Debug, Clone, Default)]
pub struct ResourceStore {
    resources: Vec<StoredResource>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with the server's own documentation.
    pub fn with_default_resources() -> Self {
        let mut store = Self::new();
        store.insert(
            ResourceDescriptor {
                uri: "docs://readme".to_string(),
                name: "readme".to_string(),
                title: Some("Server README".to_string()),
                description: Some("How to talk to this server".to_string()),
                mime_type: "text/markdown".to_string(),
            },
            README.to_string(),
        );
        store.insert(
            ResourceDescriptor {
                uri: "docs://tools".to_string(),
                name: "tools".to_string(),
                title: Some("Tool catalogue".to_string()),
                description: Some("Short reference for the built-in tools".to_string()),
                mime_type: "text/plain".to_string(),
            },
            TOOLS.to_string(),
        );
        store
    }

    /// Insert or replace a resource.
    pub fn insert(&mut self, descriptor: ResourceDescriptor, text: String) {
        self.resources.retain(|r| r.descriptor.uri != descriptor.uri);
        self.resources.push(StoredResource { descriptor, text });
    }

    /// Descriptors only, never content.
    pub fn descriptors(&self) -> Vec<ResourceDescriptor> {
        self.resources.iter().map(|r| r.descriptor.clone()).collect()
    }

    pub fn read(&self, uri: &str) -> Option<ResourceContents> {
        self.resources
            .iter()
            .find(|r| r.descriptor.uri == uri)
            .map(|r| ResourceContents {
                uri: r.descriptor.uri.clone(),
                mime_type: r.descriptor.mime_type.clone(),
                text: r.text.clone(),
            })
    }
}

const README: &str = "# mcpstream\n\n\
POST JSON-RPC messages to the MCP endpoint. Start with `initialize` and send the \
returned `Mcp-Session-Id` header on every later request. Add `text/event-stream` \
to the Accept header to receive responses as a stream, or open a GET stream for \
server notifications.\n";

const TOOLS: &str = "echo(text: string) -> the same text\n\
sum(values: number[]) -> the total of values\n";
