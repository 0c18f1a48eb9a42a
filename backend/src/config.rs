//! Configuration management.

use anyhow::Context;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::state::{DEFAULT_ENDPOINT_PATH, DEFAULT_KEEPALIVE};

/// Prefix of environment variables, e.g. `MCPSTREAM_SERVER__PORT=4000`.
const ENV_PREFIX: &str = "MCPSTREAM_";

/// Name of the per-directory config file.
const LOCAL_CONFIG_FILE: &str = ".mcpstream.toml";

/// Configuration structure that matches the TOML file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    stream: StreamConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ServerConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_path")]
    path: String,
    /// Origin admitted in addition to `http://localhost*`
    allowed_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_path(),
            allowed_origin: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StreamConfig {
    /// Seconds between keepalive comments on push channels
    #[serde(default = "default_keepalive_secs")]
    keepalive_secs: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            keepalive_secs: default_keepalive_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct LoggingConfig {
    /// Path to log file (if set, logs will be written to file in addition to stdout)
    log_file: Option<PathBuf>,
    /// Log level (trace, debug, info, warn, error)
    /// If not set, uses RUST_LOG environment variable or defaults to "info"
    log_level: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    mcpstream_types::DEFAULT_PORT
}

fn default_path() -> String {
    DEFAULT_ENDPOINT_PATH.to_string()
}

fn default_keepalive_secs() -> u64 {
    DEFAULT_KEEPALIVE.as_secs()
}

/// Values given on the command line. `None` leaves lower layers in charge.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: Option<String>,
    pub allowed_origin: Option<String>,
    pub keepalive_secs: Option<u64>,
    pub log_level: Option<String>,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Path of the MCP endpoint, always starting with `/`
    pub path: String,
    /// Origin admitted in addition to localhost origins
    pub allowed_origin: Option<String>,
    /// Interval between keepalive comments on push channels
    pub keepalive_interval: Duration,
    /// Path to log file (if set, logs will be written to file in addition to stdout)
    pub log_file: Option<PathBuf>,
    /// Log level (if set, overrides RUST_LOG environment variable)
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with full priority chain: CLI args > env vars > config files > defaults.
    ///
    /// Config files are searched in this order:
    /// 1. `config.toml` in user config directory (~/.config/mcpstream/ on Linux)
    /// 2. `.mcpstream.toml` in current directory
    pub fn from_figment(overrides: ConfigOverrides) -> anyhow::Result<Self> {
        let local_config = std::env::current_dir()
            .ok()
            .map(|d| d.join(LOCAL_CONFIG_FILE));
        let user_config = directories::ProjectDirs::from("", "", "mcpstream")
            .map(|dirs| dirs.config_dir().join("config.toml"));

        // defaults < user config < local config < env vars < CLI args
        let mut figment = Figment::new().merge(Serialized::defaults(ConfigFile::default()));

        if let Some(ref path) = user_config {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        if let Some(ref path) = local_config {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        // MCPSTREAM_SERVER__ALLOWED_ORIGIN -> server.allowed_origin
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        if let Some(ref host) = overrides.host {
            figment = figment.merge(Serialized::default("server.host", host));
        }
        if let Some(port) = overrides.port {
            figment = figment.merge(Serialized::default("server.port", port));
        }
        if let Some(ref path) = overrides.path {
            figment = figment.merge(Serialized::default("server.path", path));
        }
        if let Some(ref origin) = overrides.allowed_origin {
            figment = figment.merge(Serialized::default("server.allowed_origin", origin));
        }
        if let Some(secs) = overrides.keepalive_secs {
            figment = figment.merge(Serialized::default("stream.keepalive_secs", secs));
        }
        if let Some(ref level) = overrides.log_level {
            figment = figment.merge(Serialized::default("logging.log_level", level));
        }

        let config_file: ConfigFile = figment.extract()?;
        Self::from_file(config_file)
    }

    fn from_file(file: ConfigFile) -> anyhow::Result<Self> {
        anyhow::ensure!(
            file.stream.keepalive_secs > 0,
            "stream.keepalive_secs must be greater than zero"
        );

        let path = if file.server.path.starts_with('/') {
            file.server.path
        } else {
            format!("/{}", file.server.path)
        };

        Ok(Self {
            host: file.server.host,
            port: file.server.port,
            path,
            allowed_origin: file.server.allowed_origin.filter(|o| !o.is_empty()),
            keepalive_interval: Duration::from_secs(file.stream.keepalive_secs),
            log_file: file.logging.log_file,
            log_level: file.logging.log_level,
        })
    }

    /// Socket address to bind.
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

impl Default for Config {
    fn default() -> Self {
        // defaults always pass validation
        Self {
            host: default_host(),
            port: default_port(),
            path: default_path(),
            allowed_origin: None,
            keepalive_interval: DEFAULT_KEEPALIVE,
            log_file: None,
            log_level: None,
        }
    }
}
