//! Qubic server - two-player TCP server for 4x4x4 tic-tac-toe.
//!
//! # Architecture
//!
//! - **Protocol**: JSON messages framed one per line
//! - **Session**: one connected player, with a bounded outbound queue
//! - **Server**: the single game, its roster of at most two players, and
//!   the lock that orders every move
//!
//! Binding the socket, configuration and process lifetime belong to the
//! caller (see the `qubic_server` binary).
//!
//! # Example
//!
//! ```no_run
//! use qubic_server::GameServer;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:5555").await?;
//! let addr = listener.local_addr()?;
//! GameServer::new().run(listener, addr).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cli;
mod error;
pub mod protocol;
mod server;
mod session;

pub use error::ServerError;
pub use protocol::{ClientMessage, ServerMessage};
pub use server::{GamePhase, GameServer, SEATS};
pub use session::{ConnectionId, OUTBOUND_CAPACITY, Session, SessionReader};
