//! MCP JSON-RPC method dispatch.
//!
//! Maps a method name and its params to an [`Outcome`], calling into the
//! tool registry and resource store held by [`AppState`].

use futures::FutureExt;
use mcpstream_types::jsonrpc::METHOD_NOT_FOUND;
use mcpstream_types::mcp::{ListChangedCapability, ResourcesCapability};
use mcpstream_types::{
    CallToolParams, CallToolResult, Implementation, InitializeResult, JsonRpcError,
    JsonRpcResponse, ListResourcesResult, ListToolsResult, ReadResourceParams,
    ReadResourceResult, RequestId, ServerCapabilities, PROTOCOL_VERSION,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::panic::AssertUnwindSafe;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::mcp::session::McpSession;
use crate::state::AppState;

/// Name advertised in `serverInfo`.
pub const SERVER_NAME: &str = "mcpstream";

const INSTRUCTIONS: &str = "Call tools/list to discover the echo and sum tools and \
resources/list for the server documentation. Send Accept: text/event-stream to \
receive progress notifications alongside responses.";

/// Session state a method expects before it is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPrecondition {
    None,
    Initialized,
}

/// Methods known to the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum McpMethod {
    Initialize,
    Initialized,
    Cancelled,
    Ping,
    ToolsList,
    ToolsCall,
    ResourcesList,
    ResourcesRead,
    Unknown(String),
}

impl McpMethod {
    pub fn from_name(name: &str) -> Self {
        match name {
            "initialize" => McpMethod::Initialize,
            "notifications/initialized" => McpMethod::Initialized,
            "notifications/cancelled" => McpMethod::Cancelled,
            "ping" => McpMethod::Ping,
            "tools/list" => McpMethod::ToolsList,
            "tools/call" => McpMethod::ToolsCall,
            "resources/list" => McpMethod::ResourcesList,
            "resources/read" => McpMethod::ResourcesRead,
            other => McpMethod::Unknown(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            McpMethod::Initialize => "initialize",
            McpMethod::Initialized => "notifications/initialized",
            McpMethod::Cancelled => "notifications/cancelled",
            McpMethod::Ping => "ping",
            McpMethod::ToolsList => "tools/list",
            McpMethod::ToolsCall => "tools/call",
            McpMethod::ResourcesList => "resources/list",
            McpMethod::ResourcesRead => "resources/read",
            McpMethod::Unknown(name) => name,
        }
    }

    /// Declared, not enforced: calls on uninitialized sessions are logged
    /// and then served anyway.
    pub fn precondition(&self) -> SessionPrecondition {
        match self {
            McpMethod::ToolsList
            | McpMethod::ToolsCall
            | McpMethod::ResourcesList
            | McpMethod::ResourcesRead => SessionPrecondition::Initialized,
            _ => SessionPrecondition::None,
        }
    }
}

/// Result of routing one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Result(Value),
    Error(JsonRpcError),
    /// Nothing to send back.
    AcceptOnly,
}

impl Outcome {
    /// Build the JSON-RPC response for a request.
    pub fn into_response(self, id: RequestId) -> JsonRpcResponse {
        match self {
            Outcome::Result(result) => JsonRpcResponse::success(id, result),
            Outcome::Error(error) => JsonRpcResponse::error(Some(id), error),
            Outcome::AcceptOnly => JsonRpcResponse::success(id, json!({})),
        }
    }
}

/// MCP request router.
pub struct McpHandler;

impl McpHandler {
    /// Route one message for `session`.
    ///
    /// Application failures come back as [`Outcome::Error`]; an `Err` means
    /// the exchange itself could not be served.
    pub async fn dispatch(
        state: &AppState,
        session: &McpSession,
        method: &str,
        params: Option<&Value>,
    ) -> Result<Outcome, TransportError> {
        let method = McpMethod::from_name(method);
        debug!("MCP: Handling method: {}", method.name());

        if method.precondition() == SessionPrecondition::Initialized && !session.is_initialized()
        {
            debug!(
                "MCP: {} called on session {} before notifications/initialized",
                method.name(),
                session.id()
            );
        }

        match method {
            McpMethod::Initialize => Ok(Outcome::Result(serde_json::to_value(
                Self::initialize_result(),
            )?)),
            McpMethod::Initialized => {
                session.mark_initialized();
                Ok(Outcome::AcceptOnly)
            }
            McpMethod::Cancelled => Ok(Outcome::AcceptOnly),
            McpMethod::Ping => Ok(Outcome::Result(json!({}))),
            McpMethod::ToolsList => Ok(Outcome::Result(serde_json::to_value(ListToolsResult {
                tools: state.tools().descriptors(),
                next_cursor: None,
            })?)),
            McpMethod::ToolsCall => Self::call_tool(state, params).await,
            McpMethod::ResourcesList => {
                Ok(Outcome::Result(serde_json::to_value(ListResourcesResult {
                    resources: state.resources().descriptors(),
                    next_cursor: None,
                })?))
            }
            McpMethod::ResourcesRead => Self::read_resource(state, params),
            McpMethod::Unknown(name) => Ok(Outcome::Error(JsonRpcError::method_not_found(&name))),
        }
    }

    fn initialize_result() -> InitializeResult {
        InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ListChangedCapability {
                    list_changed: false,
                }),
                resources: Some(ResourcesCapability {
                    subscribe: false,
                    list_changed: false,
                }),
                logging: Some(json!({})),
            },
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                title: Some("mcpstream demo server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }

    /// Handle `tools/call`.
    ///
    /// A failing tool still yields a successful result, flagged `isError`.
    async fn call_tool(state: &AppState, params: Option<&Value>) -> Result<Outcome, TransportError> {
        let params: CallToolParams = match parse_params(params) {
            Ok(p) => p,
            Err(e) => return Ok(Outcome::Error(e)),
        };

        let Some(tool) = state.tools().get(&params.name) else {
            return Ok(Outcome::Error(JsonRpcError::new(
                METHOD_NOT_FOUND,
                format!("Unknown tool: {}", params.name),
            )));
        };

        let arguments = params.arguments.unwrap_or_else(|| json!({}));
        let call = AssertUnwindSafe(tool.handler.call(arguments)).catch_unwind();
        let result = match call.await {
            Ok(Ok(content)) => {
                info!("MCP: Tool {} completed", params.name);
                CallToolResult::success(content)
            }
            Ok(Err(e)) => {
                info!("MCP: Tool {} failed: {}", params.name, e);
                CallToolResult::failure(e.to_string())
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "tool panicked".to_string());
                warn!("MCP: Tool {} panicked: {}", params.name, message);
                CallToolResult::failure(message)
            }
        };

        Ok(Outcome::Result(serde_json::to_value(result)?))
    }

    /// Handle `resources/read`.
    fn read_resource(state: &AppState, params: Option<&Value>) -> Result<Outcome, TransportError> {
        let params: ReadResourceParams = match parse_params(params) {
            Ok(p) => p,
            Err(e) => return Ok(Outcome::Error(e)),
        };

        match state.resources().read(&params.uri) {
            Some(contents) => Ok(Outcome::Result(serde_json::to_value(ReadResourceResult {
                contents: vec![contents],
            })?)),
            None => Ok(Outcome::Error(JsonRpcError::invalid_params(format!(
                "Resource not found: {}",
                params.uri
            )))),
        }
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<&Value>) -> Result<T, JsonRpcError> {
    let value = params.cloned().unwrap_or_else(|| json!({}));
    serde_json::from_value(value)
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {}", e)))
}
