//! marksync-server binary entry point.
//!
//! Usage:
//! ```bash
//! marksync-server --config marksync.toml
//! marksync-server --help
//! ```

use anyhow::Context;
use clap::Parser;
use marksync_server::config::Config;
use marksync_server::server::SyncServer;
use marksync_server::{http, logging};
use std::path::PathBuf;
use std::sync::Arc;

/// Sync server for client-encrypted bookmark collections.
#[derive(Parser, Debug)]
#[command(name = "marksync-server", version, about)]
struct Cli {
    /// Configuration file (default: ./marksync.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind address from the configuration
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }

    let _log_guard = logging::init(&config.logging)?;
    tracing::info!("Starting marksync-server v{}", env!("CARGO_PKG_VERSION"));

    let bind_address = config.server.bind_address.clone();
    let server = Arc::new(
        SyncServer::open(config)
            .await
            .context("opening collection storage")?,
    );

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("binding {bind_address}"))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, http::build_router(server.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("Shutting down");
    server.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
