//! Per-agent state and its immutable per-step view.

use std::fmt;

use super::error::AgentError;
use crate::graph::{Cell, Direction};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tolerance used when comparing accumulated cell fractions against 1.
pub const FRACTION_EPSILON: f64 = 1e-6;

/// Lifecycle of a train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AgentStatus {
    /// Waiting to enter the network at its initial cell.
    Ready,
    /// On the network and moving toward its target.
    Active,
    /// Reached its target and left the network.
    Done,
    /// Stuck in a blocking cycle; only environment intervention frees it.
    Deadlocked,
}

impl AgentStatus {
    /// Returns all statuses in order.
    pub fn all() -> [AgentStatus; 4] {
        [
            AgentStatus::Ready,
            AgentStatus::Active,
            AgentStatus::Done,
            AgentStatus::Deadlocked,
        ]
    }

    pub fn index(&self) -> usize {
        match self {
            AgentStatus::Ready => 0,
            AgentStatus::Active => 1,
            AgentStatus::Done => 2,
            AgentStatus::Deadlocked => 3,
        }
    }

    /// One-hot encoding as a 4-element vector.
    pub fn one_hot(&self) -> [f64; 4] {
        let mut v = [0.0; 4];
        v[self.index()] = 1.0;
        v
    }

    /// Whether an agent with this status physically occupies its cell.
    pub fn is_on_map(&self) -> bool {
        matches!(self, AgentStatus::Active | AgentStatus::Deadlocked)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentStatus::Ready => write!(f, "ready"),
            AgentStatus::Active => write!(f, "active"),
            AgentStatus::Done => write!(f, "done"),
            AgentStatus::Deadlocked => write!(f, "deadlocked"),
        }
    }
}

/// Mutable state of one train, owned by the [`AgentStore`](super::AgentStore).
#[derive(Debug, Clone, PartialEq)]
pub struct AgentState {
    /// Index of this agent in the store.
    pub handle: usize,
    pub initial_position: Cell,
    pub initial_direction: Direction,
    pub position: Cell,
    pub direction: Direction,
    pub target: Cell,
    /// Fraction of a cell traversed per step, in (0, 1].
    pub speed: f64,
    /// Progress through the current cell, in [0, 1).
    pub position_fraction: f64,
    pub status: AgentStatus,
    /// Remaining turns the train is broken down for.
    pub malfunction: u32,
}

impl AgentState {
    /// Creates a READY agent at its initial cell.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSpeed` unless `0 < speed <= 1`.
    pub fn new(
        handle: usize,
        position: Cell,
        direction: Direction,
        target: Cell,
        speed: f64,
    ) -> Result<Self, AgentError> {
        if !(speed > 0.0 && speed <= 1.0) {
            return Err(AgentError::InvalidSpeed(speed));
        }
        Ok(Self {
            handle,
            initial_position: position,
            initial_direction: direction,
            position,
            direction,
            target,
            speed,
            position_fraction: 0.0,
            status: AgentStatus::Ready,
            malfunction: 0,
        })
    }

    /// Puts the agent back at its initial cell, READY and repaired.
    pub fn reset(&mut self) {
        self.position = self.initial_position;
        self.direction = self.initial_direction;
        self.position_fraction = 0.0;
        self.status = AgentStatus::Ready;
        self.malfunction = 0;
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            handle: self.handle,
            position: self.position,
            direction: self.direction,
            target: self.target,
            speed: self.speed,
            position_fraction: self.position_fraction,
            status: self.status,
            malfunction: self.malfunction,
        }
    }
}

/// Read-only view of one agent, taken once per step.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AgentSnapshot {
    pub handle: usize,
    pub position: Cell,
    pub direction: Direction,
    pub target: Cell,
    pub speed: f64,
    pub position_fraction: f64,
    pub status: AgentStatus,
    pub malfunction: u32,
}

impl AgentSnapshot {
    pub fn is_on_map(&self) -> bool {
        self.status.is_on_map()
    }

    pub fn is_malfunctioning(&self) -> bool {
        self.malfunction > 0
    }

    /// Number of steps needed to traverse one cell at this speed.
    pub fn turns_per_cell(&self) -> u32 {
        (1.0 / self.speed - FRACTION_EPSILON).ceil().max(1.0) as u32
    }

    /// Steps still needed to leave the current cell, ignoring malfunctions.
    pub fn remaining_turns_in_cell(&self) -> u32 {
        let left = (1.0 - self.position_fraction.clamp(0.0, 1.0)).max(0.0);
        (left / self.speed - FRACTION_EPSILON).ceil().max(0.0) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(speed: f64) -> Result<AgentState, AgentError> {
        AgentState::new(0, Cell::new(0, 0), Direction::East, Cell::new(0, 5), speed)
    }

    #[test]
    fn speed_must_be_in_unit_interval() {
        assert!(agent(1.0).is_ok());
        assert!(agent(0.25).is_ok());
        assert_eq!(agent(0.0).unwrap_err(), AgentError::InvalidSpeed(0.0));
        assert!(agent(1.01).is_err());
        assert!(agent(f64::NAN).is_err());
    }

    #[test]
    fn new_agent_is_ready() {
        let a = agent(1.0).unwrap();
        assert_eq!(a.status, AgentStatus::Ready);
        assert!(!a.status.is_on_map());
    }

    #[test]
    fn turns_per_cell_from_speed() {
        assert_eq!(agent(1.0).unwrap().snapshot().turns_per_cell(), 1);
        assert_eq!(agent(0.5).unwrap().snapshot().turns_per_cell(), 2);
        assert_eq!(agent(1.0 / 3.0).unwrap().snapshot().turns_per_cell(), 3);
    }

    #[test]
    fn remaining_turns_account_for_fraction() {
        let mut a = agent(0.25).unwrap();
        a.position_fraction = 0.5;
        assert_eq!(a.snapshot().remaining_turns_in_cell(), 2);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut a = agent(0.5).unwrap();
        a.position = Cell::new(0, 3);
        a.status = AgentStatus::Deadlocked;
        a.malfunction = 4;
        a.reset();
        assert_eq!(a.position, Cell::new(0, 0));
        assert_eq!(a.status, AgentStatus::Ready);
        assert_eq!(a.malfunction, 0);
    }

    #[test]
    fn status_one_hot() {
        assert_eq!(AgentStatus::Active.one_hot(), [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(AgentStatus::Deadlocked.one_hot(), [0.0, 0.0, 0.0, 1.0]);
    }
}
