//! Conflict records produced by the detector.

use std::fmt;

use crate::graph::Cell;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How two predicted trajectories interfere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConflictKind {
    /// Both agents hold the same cell at the same timestep.
    SameCell,
    /// The agents swap cells between consecutive timesteps on one track.
    HeadOn,
    /// One agent runs into a cell held by a broken-down agent.
    MalfunctionBlock,
}

impl ConflictKind {
    pub fn index(&self) -> usize {
        match self {
            ConflictKind::SameCell => 0,
            ConflictKind::HeadOn => 1,
            ConflictKind::MalfunctionBlock => 2,
        }
    }

    pub fn one_hot(&self) -> [f64; 3] {
        let mut v = [0.0; 3];
        v[self.index()] = 1.0;
        v
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::SameCell => write!(f, "same-cell"),
            ConflictKind::HeadOn => write!(f, "head-on"),
            ConflictKind::MalfunctionBlock => write!(f, "malfunction-block"),
        }
    }
}

/// Where a conflict happens: a cell, or the undirected edge between two cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConflictLocation {
    Cell(Cell),
    Edge(Cell, Cell),
}

impl ConflictLocation {
    /// Edge between `a` and `b`, with endpoints in canonical order.
    pub fn edge(a: Cell, b: Cell) -> Self {
        if a <= b {
            ConflictLocation::Edge(a, b)
        } else {
            ConflictLocation::Edge(b, a)
        }
    }

    /// Whether `cell` is the conflict cell or an endpoint of the conflict edge.
    pub fn touches(&self, cell: Cell) -> bool {
        match self {
            ConflictLocation::Cell(c) => *c == cell,
            ConflictLocation::Edge(a, b) => *a == cell || *b == cell,
        }
    }
}

impl fmt::Display for ConflictLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictLocation::Cell(c) => write!(f, "{}", c),
            ConflictLocation::Edge(a, b) => write!(f, "{}-{}", a, b),
        }
    }
}

/// A pairwise interaction between two predicted trajectories.
///
/// `agent_a < agent_b` always holds, so a conflict has one canonical form
/// regardless of the order in which agents were examined. Field order is the
/// sort order of detector output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Conflict {
    pub timestep: u32,
    pub agent_a: usize,
    pub agent_b: usize,
    pub kind: ConflictKind,
    pub location: ConflictLocation,
}

impl Conflict {
    pub fn new(
        first: usize,
        second: usize,
        location: ConflictLocation,
        timestep: u32,
        kind: ConflictKind,
    ) -> Self {
        Self {
            timestep,
            agent_a: first.min(second),
            agent_b: first.max(second),
            kind,
            location,
        }
    }

    pub fn involves(&self, handle: usize) -> bool {
        self.agent_a == handle || self.agent_b == handle
    }

    /// The other party of the conflict, if `handle` takes part in it.
    pub fn other(&self, handle: usize) -> Option<usize> {
        if self.agent_a == handle {
            Some(self.agent_b)
        } else if self.agent_b == handle {
            Some(self.agent_a)
        } else {
            None
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} conflict between {} and {} at {} (t={})",
            self.kind, self.agent_a, self.agent_b, self.location, self.timestep
        )
    }
}
