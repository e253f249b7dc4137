//! Qubic - pure game logic for 4x4x4 tic-tac-toe.
//!
//! # Architecture
//!
//! - **Types**: seats, cells, coordinates and the 4x4x4 [`Board`]
//! - **Rules**: win detection around the most recent move
//! - **Game**: [`GameState`], the turn tracker and outcome
//!
//! No I/O and no locking; the server crate wraps [`GameState`] in its own
//! synchronization.
//!
//! # Example
//!
//! ```
//! use qubic::{Coord, GameState, Seat, Status};
//!
//! let mut game = GameState::new();
//! let at = Coord::new(0, 0, 0)?;
//! let snapshot = game.apply_move(Seat::X, at)?;
//! assert_eq!(snapshot.current_seat(), Seat::O);
//! assert_eq!(snapshot.status(), Status::InProgress);
//! # Ok::<(), qubic::MoveError>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod game;
pub mod rules;
mod types;

pub use game::{GameState, MoveError, Status};
pub use types::{Board, Cell, CellValues, Coord, SIZE, Seat};
