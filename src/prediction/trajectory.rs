//! Predicted trajectories: bounded sequences of `(cell, timestep)` occupations.

use crate::graph::{Cell, Direction};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What the agent is predicted to be doing at a trajectory point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PointState {
    /// Travelling, possibly still traversing the current cell.
    Moving,
    /// Broken down and standing still.
    Malfunctioning,
    /// The step at which the target cell is entered.
    Arrived,
    /// Padding after arrival; the agent has left the network.
    AtTarget,
    /// Padding after a dead end; the agent stands at its last cell.
    Halted,
}

impl PointState {
    /// Whether the agent physically holds its cell at this point.
    pub fn occupies(&self) -> bool {
        !matches!(self, PointState::AtTarget)
    }
}

/// One predicted occupation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrajectoryPoint {
    pub timestep: u32,
    pub cell: Cell,
    pub heading: Direction,
    pub state: PointState,
}

/// How a prediction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PredictionOutcome {
    /// The agent is no longer on the network; the trajectory is empty.
    Inactive,
    /// The horizon was reached while travelling.
    Horizon,
    /// The target is entered at timestep `at`.
    Arrived { at: u32 },
    /// No exit was available at timestep `at`.
    Halted { at: u32 },
}

/// Predicted trajectory of one agent over timesteps `0..=H`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PredictedTrajectory {
    pub handle: usize,
    pub points: Vec<TrajectoryPoint>,
    pub outcome: PredictionOutcome,
}

impl PredictedTrajectory {
    pub(crate) fn inactive(handle: usize) -> Self {
        Self {
            handle,
            points: Vec::new(),
            outcome: PredictionOutcome::Inactive,
        }
    }

    /// Point at `timestep`, if predicted.
    pub fn at(&self, timestep: u32) -> Option<&TrajectoryPoint> {
        self.points.get(timestep as usize)
    }

    /// Cell held at `timestep`; `None` once the agent has left the network.
    pub fn occupied_cell(&self, timestep: u32) -> Option<Cell> {
        self.at(timestep)
            .filter(|p| p.state.occupies())
            .map(|p| p.cell)
    }

    /// The predicted cells, one per timestep.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.points.iter().map(|p| p.cell)
    }

    /// Distinct cells visited in order, without repeats from waiting.
    pub fn path(&self) -> Vec<Cell> {
        let mut path: Vec<Cell> = Vec::new();
        for p in self.points.iter().filter(|p| p.state.occupies()) {
            if path.last() != Some(&p.cell) {
                path.push(p.cell);
            }
        }
        path
    }

    /// First timestep at which `cell` is held, if any.
    pub fn first_visit(&self, cell: Cell) -> Option<u32> {
        self.points
            .iter()
            .find(|p| p.cell == cell && p.state.occupies())
            .map(|p| p.timestep)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn arrival(&self) -> Option<u32> {
        match self.outcome {
            PredictionOutcome::Arrived { at } => Some(at),
            _ => None,
        }
    }

    pub fn halted_at(&self) -> Option<u32> {
        match self.outcome {
            PredictionOutcome::Halted { at } => Some(at),
            _ => None,
        }
    }
}
