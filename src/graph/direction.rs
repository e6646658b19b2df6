//! Grid coordinates and compass headings.
//!
//! Defines the four headings a train can travel in and the cell coordinate
//! type used as the spatial key throughout the crate.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Heading of a train on the grid.
///
/// Indices follow the flatland convention: `North = 0`, `East = 1`,
/// `South = 2`, `West = 3`. Rows grow southwards, columns eastwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// Returns all headings in index order.
    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
        ]
    }

    /// Returns the index of this heading (0=North, 1=East, 2=South, 3=West).
    pub fn index(&self) -> usize {
        match self {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
        }
    }

    /// Inverse of [`Direction::index`], taken modulo 4.
    pub fn from_index(index: usize) -> Direction {
        Self::all()[index % 4]
    }

    /// The reverse heading.
    pub fn opposite(&self) -> Direction {
        Self::from_index(self.index() + 2)
    }

    /// Heading after a quarter turn to the left.
    pub fn left(&self) -> Direction {
        Self::from_index(self.index() + 3)
    }

    /// Heading after a quarter turn to the right.
    pub fn right(&self) -> Direction {
        Self::from_index(self.index() + 1)
    }

    /// Row/column offset of one step in this heading.
    pub fn offset(&self) -> (i64, i64) {
        match self {
            Direction::North => (-1, 0),
            Direction::East => (0, 1),
            Direction::South => (1, 0),
            Direction::West => (0, -1),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::North => write!(f, "N"),
            Direction::East => write!(f, "E"),
            Direction::South => write!(f, "S"),
            Direction::West => write!(f, "W"),
        }
    }
}

/// A cell of the rail grid, addressed by `(row, col)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cell {
    pub row: u32,
    pub col: u32,
}

impl Cell {
    /// Creates a new cell coordinate.
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// The adjacent cell one step in `direction`.
    ///
    /// Returns `None` when the step would leave the non-negative quadrant.
    /// Upper grid bounds are checked by the layout, not here.
    pub fn neighbor(&self, direction: Direction) -> Option<Cell> {
        let (dr, dc) = direction.offset();
        let row = u32::try_from(self.row as i64 + dr).ok()?;
        let col = u32::try_from(self.col as i64 + dc).ok()?;
        Some(Cell { row, col })
    }

    /// Heading that leads from `self` to an orthogonally adjacent `other`.
    pub fn direction_to(&self, other: &Cell) -> Option<Direction> {
        Direction::all()
            .into_iter()
            .find(|d| self.neighbor(*d) == Some(*other))
    }

    /// Manhattan distance to another cell.
    pub fn manhattan(&self, other: &Cell) -> u32 {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}
