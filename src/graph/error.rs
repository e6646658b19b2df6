use thiserror::Error;

use super::direction::{Cell, Direction};

/// Malformed or inconsistent rail layouts, detected at construction time.
///
/// Any of these aborts environment setup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Layout contains no track")]
    EmptyLayout,

    #[error("Cell {0} lies outside the grid")]
    CellOutOfBounds(Cell),

    #[error("Layout expects {expected} cells, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("A line needs at least two cells, got {0}")]
    LineTooShort(usize),

    #[error("Cells {from} and {to} are not adjacent")]
    NotAdjacent { from: Cell, to: Cell },

    #[error("Transition {incoming}->{outgoing} at {cell} leads off the grid")]
    DanglingTransition {
        cell: Cell,
        incoming: Direction,
        outgoing: Direction,
    },

    #[error("Transition {incoming}->{outgoing} at {cell} enters {neighbor}, which has no move for heading {outgoing}")]
    InconsistentTransition {
        cell: Cell,
        incoming: Direction,
        outgoing: Direction,
        neighbor: Cell,
    },

    #[error("Cell {cell} is reachable from {from} but has no transitions and is not a terminus")]
    EmptyTransitions { cell: Cell, from: Cell },
}
