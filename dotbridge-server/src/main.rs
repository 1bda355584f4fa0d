use anyhow::Context;
use clap::Parser;
use dotbridge_core::{PathTranslator, ServerConfig};
use dotbridge_runner::ToolExecutor;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod mcp;
#[cfg(test)]
mod test_support;

use api::AppState;

#[derive(Parser)]
#[command(name = "dotbridge-server")]
#[command(about = "Exposes .NET toolchain operations over HTTP and MCP", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the configuration file
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    let translator = PathTranslator::from_style(config.toolchain.path_style);
    info!(
        program = %config.toolchain.program,
        translating_paths = translator.is_translating(),
        timeout = ?config.toolchain.timeout(),
        "Toolchain configured"
    );

    let state = AppState {
        executor: ToolExecutor::from_config(&config.toolchain),
    };
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!("Server listening on http://{}", config.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
