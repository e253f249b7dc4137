//! Wire protocol: JSON messages framed one per line.
//!
//! Every message is a single compact JSON object terminated by `\n`. Readers
//! buffer until the newline, so one TCP read carrying half a message or
//! several messages is handled the same as one read per message.

use qubic::{CellValues, GameState, Seat, Status};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::ServerError;

/// Maximum accepted frame length in bytes, newline excluded.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// `winner` value sent for a drawn game.
pub const DRAW_SENTINEL: i8 = -1;

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// First message on a new connection.
    Init {
        /// Seat assigned to this connection.
        player_id: Seat,
        /// Display name for the seat.
        player_name: String,
        /// Mark symbol, `X` or `O`.
        symbol: String,
    },
    /// Full game snapshot.
    State {
        /// Cell values in `[z][y][x]` order: 0 empty, -1 seat 0, 1 seat 1.
        jugadas: CellValues,
        /// Seat to move.
        current_player: Seat,
        /// True once won, drawn or abandoned.
        game_over: bool,
        /// `null` while undecided or abandoned, -1 for a draw, else the
        /// winning seat.
        winner: Option<i8>,
    },
    /// Private rejection sent to one client.
    Error {
        /// Human-readable reason.
        message: String,
    },
}

impl ServerMessage {
    /// Builds the greeting for a newly seated connection.
    pub fn init(seat: Seat) -> Self {
        ServerMessage::Init {
            player_id: seat,
            player_name: format!("Player {}", seat.index() + 1),
            symbol: seat.to_string(),
        }
    }

    /// Builds a state message from a game snapshot.
    pub fn state(game: &GameState) -> Self {
        ServerMessage::State {
            jugadas: game.board().values(),
            current_player: game.current_seat(),
            game_over: game.is_terminal(),
            winner: winner_code(game.status()),
        }
    }

    /// Builds an error message.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

/// Wire encoding of the outcome.
pub fn winner_code(status: Status) -> Option<i8> {
    match status {
        Status::Won(seat) => Some(seat.index() as i8),
        Status::Draw => Some(DRAW_SENTINEL),
        Status::InProgress | Status::Abandoned => None,
    }
}

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Place a mark.
    Move {
        /// Seat the client plays as.
        player: Seat,
        /// Depth.
        z: i64,
        /// Row.
        y: i64,
        /// Column.
        x: i64,
    },
    /// Start a new game on the same seats.
    Reset,
    /// Leave the game.
    Disconnect,
}

/// Parses one frame into a client message.
pub fn decode(frame: &[u8]) -> Result<ClientMessage, ServerError> {
    Ok(serde_json::from_slice(frame)?)
}

/// Serializes a message into one frame (newline not included).
pub fn encode(message: &ServerMessage) -> Result<Vec<u8>, ServerError> {
    Ok(serde_json::to_vec(message)?)
}

/// Reads the next non-blank frame.
///
/// Returns `Ok(None)` on a clean end of stream. A final frame without a
/// trailing newline is still returned. An oversized frame is discarded up
/// to and including its newline before [`ServerError::FrameTooLarge`] is
/// returned, so the next call starts on the following frame.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, ServerError>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let mut buf = Vec::new();
        let limit = (MAX_FRAME_LEN + 2) as u64;
        let n = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;
        if n == 0 {
            return Ok(None);
        }

        let terminated = buf.last() == Some(&b'\n');
        if terminated {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        if !terminated && n as u64 == limit {
            skip_line(reader).await?;
            return Err(ServerError::FrameTooLarge { limit: MAX_FRAME_LEN });
        }
        if buf.len() > MAX_FRAME_LEN {
            return Err(ServerError::FrameTooLarge { limit: MAX_FRAME_LEN });
        }
        if buf.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        return Ok(Some(buf));
    }
}

/// Consumes input up to and including the next newline, or to end of stream.
async fn skip_line<R>(reader: &mut R) -> Result<(), ServerError>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        match available.iter().position(|b| *b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                return Ok(());
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}

/// Writes one frame followed by a newline and flushes.
pub async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> Result<(), ServerError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
