//! mcpstream server.

use clap::Parser;
use tracing::info;

use mcpstream::{
    config::{Config, ConfigOverrides},
    create_app_with_state, logging,
    state::AppState,
};

/// mcpstream - MCP Streamable HTTP server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, env = "MCPSTREAM_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "MCPSTREAM_PORT")]
    port: Option<u16>,

    /// Path of the MCP endpoint
    #[arg(long)]
    path: Option<String>,

    /// Browser origin allowed in addition to http://localhost
    #[arg(long, env = "MCPSTREAM_ALLOWED_ORIGIN")]
    allowed_origin: Option<String>,

    /// Seconds between keepalive comments on push channels
    #[arg(long)]
    keepalive_secs: Option<u64>,

    /// Log level (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,
}

impl From<Args> for ConfigOverrides {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            path: args.path,
            allowed_origin: args.allowed_origin,
            keepalive_secs: args.keepalive_secs,
            log_level: args.log_level,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::from_figment(args.into())?;

    let _log_guard = logging::init(&config)?;
    info!("Configuration loaded");

    let state = AppState::from_config(&config);
    info!(
        "Registered {} tools and {} resources",
        state.tools().len(),
        state.resources().descriptors().len()
    );
    let app = create_app_with_state(state);

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}{}", addr, config.path);
    if let Some(ref origin) = config.allowed_origin {
        info!("Allowed browser origin: {}", origin);
    }

    // Set up graceful shutdown handler
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down gracefully...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down");
    Ok(())
}
