//! Server entry point for banter

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

use banter_core::config::ConfigLoader;
use banter_core::logging::init_logging;
use banter_relay::CompletionClient;
use banter_server::{run_server, AppState};
use banter_store::SessionStore;

#[derive(Parser)]
#[command(name = "banter")]
#[command(about = "A minimal streaming web chat service")]
#[command(version)]
struct Cli {
    /// Configuration directory
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Override the configured bind address
    #[arg(long)]
    host: Option<String>,

    /// Override the configured port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loader = match &cli.config_dir {
        Some(dir) => ConfigLoader::with_dir(dir),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load()?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let _guard = init_logging(&config.logging);

    let store = SessionStore::connect(&config.store.path)
        .await
        .context("failed to open session store")?;
    let relay = Arc::new(CompletionClient::from_config(&config.upstream));
    let state = AppState { store, relay };

    let addr = SocketAddr::new(
        config.server.host.parse().context("invalid server.host")?,
        config.server.port,
    );

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
            let _ = shutdown_tx.send(());
        }
    });

    run_server(
        state,
        addr,
        Path::new(&config.server.public_dir),
        shutdown_rx,
    )
    .await
}
