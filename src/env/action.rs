use std::fmt;

use crate::graph::Direction;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Discrete action of one train for one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RailAction {
    /// Keep doing what the train was doing.
    #[default]
    DoNothing,
    MoveLeft,
    MoveForward,
    MoveRight,
    StopMoving,
}

impl RailAction {
    pub const COUNT: usize = 5;

    pub fn all() -> [RailAction; Self::COUNT] {
        [
            RailAction::DoNothing,
            RailAction::MoveLeft,
            RailAction::MoveForward,
            RailAction::MoveRight,
            RailAction::StopMoving,
        ]
    }

    pub fn index(&self) -> usize {
        match self {
            RailAction::DoNothing => 0,
            RailAction::MoveLeft => 1,
            RailAction::MoveForward => 2,
            RailAction::MoveRight => 3,
            RailAction::StopMoving => 4,
        }
    }

    pub fn from_index(i: usize) -> Option<Self> {
        Self::all().get(i).copied()
    }

    pub fn is_move(&self) -> bool {
        matches!(
            self,
            RailAction::MoveLeft | RailAction::MoveForward | RailAction::MoveRight
        )
    }

    /// Heading this action asks for when leaving a cell entered with `heading`.
    pub fn preferred_heading(&self, heading: Direction) -> Option<Direction> {
        match self {
            RailAction::MoveLeft => Some(heading.left()),
            RailAction::MoveForward | RailAction::DoNothing => Some(heading),
            RailAction::MoveRight => Some(heading.right()),
            RailAction::StopMoving => None,
        }
    }

    /// Action that leaves a cell entered with `heading` toward `exit`.
    pub fn toward(heading: Direction, exit: Direction) -> Self {
        if exit == heading.left() {
            RailAction::MoveLeft
        } else if exit == heading.right() {
            RailAction::MoveRight
        } else {
            RailAction::MoveForward
        }
    }
}

impl fmt::Display for RailAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RailAction::DoNothing => write!(f, "do-nothing"),
            RailAction::MoveLeft => write!(f, "left"),
            RailAction::MoveForward => write!(f, "forward"),
            RailAction::MoveRight => write!(f, "right"),
            RailAction::StopMoving => write!(f, "stop"),
        }
    }
}
