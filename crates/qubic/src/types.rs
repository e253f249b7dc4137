//! Core domain types for 4x4x4 tic-tac-toe.

use crate::MoveError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Edge length of the cube.
pub const SIZE: usize = 4;

/// One of the two player slots.
///
/// Seats travel over the wire as their index (`0` or `1`) and are shown
/// to players as their symbol (`X` or `O`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(try_from = "u8", into = "u8")]
pub enum Seat {
    /// Seat 0 (moves first).
    X,
    /// Seat 1.
    O,
}

impl Seat {
    /// Returns the seat index (0 or 1).
    pub fn index(self) -> u8 {
        match self {
            Seat::X => 0,
            Seat::O => 1,
        }
    }

    /// Returns the seat for an index, if it names one.
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Seat::X),
            1 => Some(Seat::O),
            _ => None,
        }
    }

    /// Returns the other seat.
    pub fn other(self) -> Self {
        match self {
            Seat::X => Seat::O,
            Seat::O => Seat::X,
        }
    }

    /// Signed mark written into the board: -1 for seat 0, +1 for seat 1.
    ///
    /// Four collinear cells sum to ±4 exactly when they all hold one seat's
    /// mark, which is what the win check relies on.
    pub fn mark(self) -> i8 {
        match self {
            Seat::X => -1,
            Seat::O => 1,
        }
    }
}

impl From<Seat> for u8 {
    fn from(seat: Seat) -> Self {
        seat.index()
    }
}

impl TryFrom<u8> for Seat {
    type Error = String;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Seat::from_index(index).ok_or_else(|| format!("invalid seat index {index}"))
    }
}

/// A cell of the cube.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    /// Empty cell.
    #[default]
    Empty,
    /// Cell holding a seat's mark.
    Occupied(Seat),
}

impl Cell {
    /// Signed value of the cell: 0 when empty, otherwise the seat's mark.
    pub fn value(self) -> i8 {
        match self {
            Cell::Empty => 0,
            Cell::Occupied(seat) => seat.mark(),
        }
    }
}

/// A validated board coordinate, addressed as (z, y, x).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    z: usize,
    y: usize,
    x: usize,
}

impl Coord {
    /// Creates a coordinate, failing with [`MoveError::OutOfRange`] unless
    /// every component lies in `0..4`.
    pub fn new(z: i64, y: i64, x: i64) -> Result<Self, MoveError> {
        let axis = |v: i64| usize::try_from(v).ok().filter(|v| *v < SIZE);
        match (axis(z), axis(y), axis(x)) {
            (Some(z), Some(y), Some(x)) => Ok(Self { z, y, x }),
            _ => Err(MoveError::OutOfRange { z, y, x }),
        }
    }

    /// Depth (layer) index.
    pub fn z(&self) -> usize {
        self.z
    }

    /// Row index.
    pub fn y(&self) -> usize {
        self.y
    }

    /// Column index.
    pub fn x(&self) -> usize {
        self.x
    }

    /// All 64 coordinates in z, y, x order.
    pub fn all() -> impl Iterator<Item = Coord> {
        (0..SIZE).flat_map(|z| {
            (0..SIZE).flat_map(move |y| (0..SIZE).map(move |x| Coord { z, y, x }))
        })
    }

    pub(crate) fn from_parts(z: usize, y: usize, x: usize) -> Self {
        debug_assert!(z < SIZE && y < SIZE && x < SIZE);
        Self { z, y, x }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.z, self.y, self.x)
    }
}

/// Signed cell values in `[z][y][x]` order.
pub type CellValues = [[[i8; SIZE]; SIZE]; SIZE];

/// The 4x4x4 cube.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    cells: [[[Cell; SIZE]; SIZE]; SIZE],
}

impl Board {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the cell at a coordinate.
    pub fn get(&self, at: Coord) -> Cell {
        self.cells[at.z][at.y][at.x]
    }

    /// Sets the cell at a coordinate.
    pub fn set(&mut self, at: Coord, cell: Cell) {
        self.cells[at.z][at.y][at.x] = cell;
    }

    /// Checks if a cell is empty.
    pub fn is_empty(&self, at: Coord) -> bool {
        self.get(at) == Cell::Empty
    }

    /// True once no cell is empty.
    pub fn is_full(&self) -> bool {
        self.cells.iter().flatten().flatten().all(|c| *c != Cell::Empty)
    }

    /// Signed value at raw indices. Callers guarantee the indices are in range.
    pub(crate) fn value(&self, z: usize, y: usize, x: usize) -> i8 {
        self.cells[z][y][x].value()
    }

    /// Returns every cell as its signed value.
    pub fn values(&self) -> CellValues {
        let mut out = [[[0; SIZE]; SIZE]; SIZE];
        for at in Coord::all() {
            out[at.z][at.y][at.x] = self.get(at).value();
        }
        out
    }
}

/// Layers are printed top to bottom, `.` for empty cells.
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (z, layer) in self.cells.iter().enumerate() {
            writeln!(f, "z={z}")?;
            for row in layer {
                for cell in row {
                    let symbol = match cell {
                        Cell::Empty => ".".to_string(),
                        Cell::Occupied(seat) => seat.to_string(),
                    };
                    f.write_str(&symbol)?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
