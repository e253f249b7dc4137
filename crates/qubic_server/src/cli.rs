//! Command-line interface for qubic_server.

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpSocket, lookup_host};
use tracing::{info, instrument, warn};

/// Qubic - 4x4x4 tic-tac-toe server for two players
#[derive(Parser, Debug, Clone)]
#[command(name = "qubic_server")]
#[command(about = "Two-player 4x4x4 tic-tac-toe server", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Host to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind to
    #[arg(env = "PORT", default_value_t = 5555)]
    pub port: u16,

    /// Pending connections the OS may queue
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(2..))]
    pub backlog: u32,

    /// Bind attempts before giving up
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub bind_attempts: u32,

    /// Delay between bind attempts in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub bind_retry_delay_ms: u64,
}

impl Cli {
    /// Binds the listening socket, retrying up to `bind_attempts` times.
    #[instrument(skip(self), fields(host = %self.host, port = self.port))]
    pub async fn bind(&self) -> std::io::Result<(TcpListener, SocketAddr)> {
        let mut attempt = 1;
        loop {
            match self.bind_once().await {
                Ok(bound) => return Ok(bound),
                Err(e) if attempt < self.bind_attempts => {
                    warn!(attempt, error = %e, "Bind failed, retrying");
                    attempt += 1;
                    tokio::time::sleep(Duration::from_millis(self.bind_retry_delay_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn bind_once(&self) -> std::io::Result<(TcpListener, SocketAddr)> {
        let addr = lookup_host((self.host.as_str(), self.port))
            .await?
            .next()
            .ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::AddrNotAvailable, "host resolved to no address")
            })?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        let listener = socket.listen(self.backlog)?;
        let local = listener.local_addr()?;
        info!(%local, backlog = self.backlog, "Listening");
        Ok((listener, local))
    }
}
