//! Game rules for 4x4x4 tic-tac-toe.
//!
//! Pure functions over a [`Board`](crate::Board); rules are kept apart from
//! board storage and turn tracking.

pub mod win;

pub use win::{LINE_PATTERNS, is_winning_move, line_cells};
