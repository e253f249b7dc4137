//! Game state and move application.

use crate::rules::is_winning_move;
use crate::types::{Board, Cell, Coord, Seat};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Error that can occur when applying a move.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum MoveError {
    /// A coordinate lies outside the cube.
    #[display("Coordinate ({z}, {y}, {x}) is outside the board")]
    OutOfRange {
        /// Requested depth.
        z: i64,
        /// Requested row.
        y: i64,
        /// Requested column.
        x: i64,
    },

    /// The cell already holds a mark.
    #[display("Cell {_0} is already occupied")]
    CellOccupied(#[error(not(source))] Coord),

    /// The seat tried to move out of turn.
    #[display("It's not {_0}'s turn")]
    NotYourTurn(#[error(not(source))] Seat),

    /// The game has ended and awaits a reset.
    #[display("Game is already over")]
    GameAlreadyOver,
}

/// Current status of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Moves are being accepted.
    InProgress,
    /// A seat completed a line.
    Won(Seat),
    /// The board filled up without a line.
    Draw,
    /// A player left mid-game.
    Abandoned,
}

impl Status {
    /// True for every status except [`Status::InProgress`].
    pub fn is_terminal(self) -> bool {
        self != Status::InProgress
    }
}

/// The single source of truth for one game: board, turn and outcome.
///
/// Only mutated through [`apply_move`](Self::apply_move),
/// [`reset`](Self::reset) and [`force_end`](Self::force_end). Once terminal,
/// the state stays frozen until reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    board: Board,
    current: Seat,
    status: Status,
}

impl GameState {
    /// Creates a fresh game: empty board, seat 0 to move.
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            current: Seat::X,
            status: Status::InProgress,
        }
    }

    /// Returns the board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Returns the seat to move.
    pub fn current_seat(&self) -> Seat {
        self.current
    }

    /// Returns the game status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// True once the game has been won, drawn or abandoned.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns an owned copy of the state.
    pub fn snapshot(&self) -> GameState {
        self.clone()
    }

    /// Places `seat`'s mark at `at` and settles the outcome.
    ///
    /// Nothing is mutated on error. On success the returned snapshot is
    /// either won, drawn, or in progress with the turn passed to the other
    /// seat.
    #[instrument(skip(self), fields(current = %self.current, status = ?self.status))]
    pub fn apply_move(&mut self, seat: Seat, at: Coord) -> Result<GameState, MoveError> {
        if seat != self.current {
            debug!("Seat moved out of turn");
            return Err(MoveError::NotYourTurn(seat));
        }
        if self.is_terminal() {
            debug!("Move after game end");
            return Err(MoveError::GameAlreadyOver);
        }
        if !self.board.is_empty(at) {
            debug!("Cell already occupied");
            return Err(MoveError::CellOccupied(at));
        }

        self.board.set(at, Cell::Occupied(seat));

        if is_winning_move(&self.board, at) {
            info!(winner = %seat, "Line completed");
            self.status = Status::Won(seat);
        } else if self.board.is_full() {
            info!("Board full without a line, draw");
            self.status = Status::Draw;
        } else {
            self.current = seat.other();
        }
        if self.is_terminal() {
            debug!(board = %self.board, "Final board");
        }

        Ok(self.snapshot())
    }

    /// Restores an empty board with seat 0 to move.
    #[instrument(skip(self))]
    pub fn reset(&mut self) {
        info!("Resetting game");
        *self = Self::new();
    }

    /// Ends the game with no winner. The board is left as it was.
    #[instrument(skip(self), fields(status = ?self.status))]
    pub fn force_end(&mut self) {
        if !self.is_terminal() {
            info!("Game abandoned");
            self.status = Status::Abandoned;
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
