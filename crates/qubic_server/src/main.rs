//! Qubic server binary.
//!
//! Binds the listener, then hands it to [`GameServer::run`] until Ctrl+C.

#![warn(missing_docs)]

use anyhow::{Context, Result};
use clap::Parser;
use qubic_server::GameServer;
use qubic_server::cli::Cli;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,qubic_server=debug")),
        )
        .init();

    info!(host = %cli.host, port = cli.port, "Starting qubic server");

    let (listener, addr) = cli
        .bind()
        .await
        .with_context(|| format!("Failed to bind to {}:{}", cli.host, cli.port))?;

    let server = GameServer::new();
    tokio::select! {
        result = server.run(listener, addr) => result.context("Server stopped")?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
            info!("Shutting down");
        }
    }

    Ok(())
}
