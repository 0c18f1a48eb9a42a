//! Application state management.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::mcp::McpSessionManager;
use crate::origin::OriginPolicy;
use crate::resources::ResourceStore;
use crate::tools::ToolRegistry;

/// Default path of the MCP endpoint.
pub const DEFAULT_ENDPOINT_PATH: &str = "/mcp";

/// Default interval between keepalive comments on push channels.
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(15);

/// Transport knobs taken from configuration.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub endpoint_path: String,
    pub allowed_origin: Option<String>,
    pub keepalive_interval: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            endpoint_path: DEFAULT_ENDPOINT_PATH.to_string(),
            allowed_origin: None,
            keepalive_interval: DEFAULT_KEEPALIVE,
        }
    }
}

impl From<&Config> for TransportSettings {
    fn from(config: &Config) -> Self {
        Self {
            endpoint_path: config.path.clone(),
            allowed_origin: config.allowed_origin.clone(),
            keepalive_interval: config.keepalive_interval,
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Live MCP sessions
    sessions: McpSessionManager,
    /// Capability registry
    tools: ToolRegistry,
    /// Resource store
    resources: ResourceStore,
    origin_policy: OriginPolicy,
    settings: TransportSettings,
}

impl AppState {
    /// Create application state around the given collaborators.
    pub fn new(tools: ToolRegistry, resources: ResourceStore, settings: TransportSettings) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                sessions: McpSessionManager::new(),
                tools,
                resources,
                origin_policy: OriginPolicy::new(settings.allowed_origin.clone()),
                settings,
            }),
        }
    }

    /// Create application state with the built-in tools and resources.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ToolRegistry::with_builtin_tools(),
            ResourceStore::with_default_resources(),
            TransportSettings::from(config),
        )
    }

    pub fn sessions(&self) -> &McpSessionManager {
        &self.inner.sessions
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.inner.tools
    }

    pub fn resources(&self) -> &ResourceStore {
        &self.inner.resources
    }

    pub fn origin_policy(&self) -> &OriginPolicy {
        &self.inner.origin_policy
    }

    pub fn endpoint_path(&self) -> &str {
        &self.inner.settings.endpoint_path
    }

    pub fn keepalive_interval(&self) -> Duration {
        self.inner.settings.keepalive_interval
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(
            ToolRegistry::with_builtin_tools(),
            ResourceStore::with_default_resources(),
            TransportSettings::default(),
        )
    }
}
