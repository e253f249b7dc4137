//! Win detection for 4x4x4 tic-tac-toe.
//!
//! A win can only be created by the cell just played, so the check looks
//! at the 13 lines that can pass through that cell instead of scanning all
//! 76 lines of the cube.
//!
//! Each line pattern gives one component per axis, in (z, y, x) order:
//!
//! - `1`: the axis stays at the played coordinate,
//! - `0`: the axis sweeps upward, `i` for `i` in `0..4`,
//! - `-1`: the axis sweeps downward, `3 - i`.
//!
//! Diagonal patterns describe a fixed line of the cube. That line contains
//! the played cell only when the cell happens to lie on it; when it does not,
//! all four of its cells predate this move and cannot newly form a win.

use crate::types::{Board, Coord, SIZE};
use tracing::{instrument, trace};

/// Line patterns in (z, y, x) order.
pub const LINE_PATTERNS: [[i8; 3]; 13] = [
    // Axis-aligned
    [1, 1, 0],
    [1, 0, 1],
    [0, 1, 1],
    // Planar diagonals, one axis held
    [1, 0, 0],
    [1, 0, -1],
    [0, 1, 0],
    [0, 1, -1],
    [0, 0, 1],
    [-1, 0, 1],
    // Space diagonals
    [0, 0, 0],
    [0, 0, -1],
    [0, -1, 0],
    [-1, 0, 0],
];

/// Position along one axis for step `i` of a pattern.
fn axis_position(component: i8, played: usize, i: usize) -> usize {
    match component {
        c if c > 0 => played,
        0 => i,
        _ => SIZE - 1 - i,
    }
}

/// The four cells visited by `pattern` for a move at `at`.
pub fn line_cells(pattern: [i8; 3], at: Coord) -> [Coord; SIZE] {
    let [tz, ty, tx] = pattern;
    std::array::from_fn(|i| {
        Coord::from_parts(
            axis_position(tz, at.z(), i),
            axis_position(ty, at.y(), i),
            axis_position(tx, at.x(), i),
        )
    })
}

/// Sum of the signed cell values along one pattern.
fn line_sum(board: &Board, pattern: [i8; 3], at: Coord) -> i8 {
    line_cells(pattern, at)
        .iter()
        .map(|c| board.value(c.z(), c.y(), c.x()))
        .sum()
}

/// Returns true if the move just played at `at` completes a line.
///
/// Only meaningful right after a successful move at `at`. Pure; the board
/// is not touched.
#[instrument(skip(board), fields(at = %at))]
pub fn is_winning_move(board: &Board, at: Coord) -> bool {
    let won = LINE_PATTERNS
        .iter()
        .any(|pattern| line_sum(board, *pattern, at).unsigned_abs() as usize == SIZE);
    trace!(won, "Checked lines through move");
    won
}
