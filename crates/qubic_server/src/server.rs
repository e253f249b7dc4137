//! Game server: seats, roster and the per-connection loops.
//!
//! One accept loop plus one task per connected player. The game state and the
//! roster sit behind a single mutex. Every handler takes it once, then
//! validates, mutates and queues the resulting broadcast before releasing it,
//! so every player sees states in the order they were produced.

use crate::ServerError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::{ConnectionId, Session, SessionReader};
use qubic::{Coord, GameState, MoveError, Seat};
use std::net::SocketAddr;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, instrument, warn};

/// Players per game.
pub const SEATS: usize = 2;

const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Coarse lifecycle of the game as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum GamePhase {
    /// Fewer than two players and nothing decided yet.
    #[display("waiting for players")]
    WaitingForPlayers,
    /// Two players seated and moves being accepted.
    #[display("in progress")]
    InProgress,
    /// Won, drawn or abandoned; waits for a reset.
    #[display("finished")]
    Finished,
}

/// Everything guarded by the server lock.
#[derive(Debug)]
struct Table {
    game: GameState,
    roster: Vec<Session>,
    next_seat: Seat,
    next_connection: u64,
}

impl Table {
    fn phase(&self) -> GamePhase {
        if self.game.is_terminal() {
            GamePhase::Finished
        } else if self.roster.len() == SEATS {
            GamePhase::InProgress
        } else {
            GamePhase::WaitingForPlayers
        }
    }

    fn broadcast(&self, message: ServerMessage) {
        for session in &self.roster {
            session.send(message.clone());
        }
    }

    fn broadcast_state(&self) {
        self.broadcast(ServerMessage::state(&self.game));
    }

    fn session(&self, id: ConnectionId) -> Option<&Session> {
        self.roster.iter().find(|s| *s.id() == id)
    }
}

/// Server owning the one game and its players.
#[derive(Debug)]
pub struct GameServer {
    table: Mutex<Table>,
    seat_freed: Notify,
}

impl GameServer {
    /// Creates a server with a fresh game and no players.
    #[instrument]
    pub fn new() -> Arc<Self> {
        info!("Creating game server");
        Arc::new(Self {
            table: Mutex::new(Table {
                game: GameState::new(),
                roster: Vec::with_capacity(SEATS),
                next_seat: Seat::X,
                next_connection: 0,
            }),
            seat_freed: Notify::new(),
        })
    }

    /// Current phase of the game.
    pub async fn phase(&self) -> GamePhase {
        self.table.lock().await.phase()
    }

    /// Copy of the current game state.
    pub async fn snapshot(&self) -> GameState {
        self.table.lock().await.game.snapshot()
    }

    /// Number of connected players.
    pub async fn connected(&self) -> usize {
        self.table.lock().await.roster.len()
    }

    /// Accepts players on `listener` for as long as the process runs.
    ///
    /// While two players are seated no further connection is accepted; they
    /// wait in the listen backlog until a seat frees up. Transient accept
    /// errors are logged and retried after a short pause.
    #[instrument(skip(self, listener))]
    pub async fn run(
        self: Arc<Self>,
        listener: TcpListener,
        addr: SocketAddr,
    ) -> Result<(), ServerError> {
        info!(%addr, "Accepting players");
        loop {
            self.wait_for_open_seat().await;
            match listener.accept().await {
                Ok((stream, peer)) => self.admit(stream, peer).await,
                Err(e) => {
                    warn!(error = %e, "Accept failed");
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                }
            }
        }
    }

    async fn wait_for_open_seat(&self) {
        loop {
            if self.connected().await < SEATS {
                return;
            }
            debug!("Table full, waiting for a seat");
            self.seat_freed.notified().await;
        }
    }

    /// Seats a new connection and spawns its session task.
    #[instrument(skip(self, stream))]
    async fn admit(self: &Arc<Self>, stream: TcpStream, peer: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "Could not disable Nagle");
        }
        let (read_half, write_half) = stream.into_split();

        let mut table = self.table.lock().await;
        let id = ConnectionId(table.next_connection);
        table.next_connection += 1;
        // Seats alternate per accept, whoever is still seated.
        let seat = table.next_seat;
        table.next_seat = seat.other();

        let session = Session::spawn(id, seat, peer, write_half);
        let eviction = session.eviction();
        session.send(ServerMessage::init(seat));
        session.send(ServerMessage::state(&table.game));
        table.roster.push(session);
        info!(connection = %id, %seat, players = table.roster.len(), "Player joined");

        if table.roster.len() == SEATS {
            info!(phase = %table.phase(), "Both seats filled");
            table.broadcast_state();
        }
        drop(table);

        let server = Arc::clone(self);
        tokio::spawn(async move {
            server
                .serve(id, seat, SessionReader::new(id, read_half), eviction)
                .await;
        });
    }

    /// Per-connection loop: handle messages until the peer leaves or is
    /// evicted.
    #[instrument(skip(self, reader, eviction))]
    async fn serve<R>(
        &self,
        id: ConnectionId,
        seat: Seat,
        mut reader: SessionReader<R>,
        eviction: Arc<Notify>,
    ) where
        R: AsyncRead + Unpin,
    {
        loop {
            let received = tokio::select! {
                received = reader.recv() => received,
                () = eviction.notified() => {
                    info!("Evicted for not reading");
                    break;
                }
            };
            match received {
                Ok(Some(message)) => {
                    if self.handle(id, seat, message).await.is_break() {
                        break;
                    }
                }
                Ok(None) => {
                    info!("Peer closed connection");
                    break;
                }
                Err(e) if e.is_recoverable() => {
                    debug!(error = %e, "Ignoring unreadable message");
                }
                Err(e) => {
                    warn!(error = %e, "Connection lost");
                    break;
                }
            }
        }
        self.disconnect(id).await;
    }

    /// Applies one message under the lock.
    ///
    /// Breaks when the player asked to leave.
    async fn handle(
        &self,
        id: ConnectionId,
        seat: Seat,
        message: ClientMessage,
    ) -> ControlFlow<()> {
        let mut table = self.table.lock().await;
        match message {
            ClientMessage::Move { player, z, y, x } => {
                // Clients speak for their own seat only.
                let result = if player != seat {
                    Err(MoveError::NotYourTurn(player))
                } else {
                    Coord::new(z, y, x).and_then(|at| table.game.apply_move(seat, at))
                };
                match result {
                    Ok(_) => {
                        debug!(%seat, z, y, x, phase = %table.phase(), "Move accepted");
                        table.broadcast_state();
                    }
                    Err(e @ MoveError::CellOccupied(_)) => {
                        debug!(%seat, error = %e, "Rejected move on occupied cell");
                        if let Some(session) = table.session(id) {
                            session.send(ServerMessage::error(e.to_string()));
                        }
                    }
                    Err(e) => {
                        debug!(%seat, error = %e, "Ignoring move");
                    }
                }
            }
            ClientMessage::Reset => {
                table.game.reset();
                info!(%seat, phase = %table.phase(), "Game reset");
                table.broadcast_state();
            }
            ClientMessage::Disconnect => {
                info!(%seat, "Player asked to leave");
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Removes a session and abandons the game if it was being played.
    #[instrument(skip(self))]
    async fn disconnect(&self, id: ConnectionId) {
        let mut table = self.table.lock().await;
        let was_playing = table.phase() == GamePhase::InProgress;

        let Some(index) = table.roster.iter().position(|s| *s.id() == id) else {
            return;
        };
        let session = table.roster.remove(index);
        info!(seat = %session.seat(), peer = %session.peer(), players = table.roster.len(), "Player left");
        drop(session);

        if was_playing {
            table.game.force_end();
            table.broadcast_state();
        }
        info!(phase = %table.phase(), "Roster changed");
        drop(table);

        self.seat_freed.notify_one();
    }
}
