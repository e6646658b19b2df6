//! Agent state store and per-step snapshots.

use std::collections::{BTreeMap, BTreeSet};

use super::error::AgentError;
use super::state::{AgentSnapshot, AgentState, AgentStatus};
use crate::graph::{Cell, Direction};

/// Immutable view of every agent at one simulation step.
///
/// Shared read-only by the predictor, detector and encoders for the whole
/// step; agents are indexed by handle.
#[derive(Debug, Clone, PartialEq)]
pub struct StepSnapshot {
    pub step: u32,
    agents: Vec<AgentSnapshot>,
}

impl StepSnapshot {
    pub fn new(step: u32, agents: Vec<AgentSnapshot>) -> Self {
        Self { step, agents }
    }

    pub fn get(&self, handle: usize) -> Option<&AgentSnapshot> {
        self.agents.get(handle)
    }

    pub fn agents(&self) -> &[AgentSnapshot] {
        &self.agents
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.agents.iter()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Agents that have not finished yet.
    pub fn remaining(&self) -> usize {
        self.agents
            .iter()
            .filter(|a| a.status != AgentStatus::Done)
            .count()
    }

    /// On-map agents located at `cell`.
    pub fn occupants(&self, cell: Cell) -> impl Iterator<Item = &AgentSnapshot> {
        self.agents
            .iter()
            .filter(move |a| a.is_on_map() && a.position == cell)
    }
}

/// Owns the mutable state of every train.
///
/// The environment mutates agents once per step; the observation core only
/// ever sees the [`StepSnapshot`] returned by [`AgentStore::snapshot`].
#[derive(Debug, Clone, Default)]
pub struct AgentStore {
    agents: Vec<AgentState>,
}

impl AgentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a READY agent and returns its handle.
    pub fn add(
        &mut self,
        position: Cell,
        direction: Direction,
        target: Cell,
        speed: f64,
    ) -> Result<usize, AgentError> {
        let handle = self.agents.len();
        self.agents
            .push(AgentState::new(handle, position, direction, target, speed)?);
        Ok(handle)
    }

    pub fn get(&self, handle: usize) -> Result<&AgentState, AgentError> {
        self.agents
            .get(handle)
            .ok_or(AgentError::UnknownHandle(handle))
    }

    pub fn get_mut(&mut self, handle: usize) -> Result<&mut AgentState, AgentError> {
        self.agents
            .get_mut(handle)
            .ok_or(AgentError::UnknownHandle(handle))
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentState> {
        self.agents.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AgentState> {
        self.agents.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Takes the immutable view used for one step.
    pub fn snapshot(&self, step: u32) -> StepSnapshot {
        StepSnapshot::new(step, self.agents.iter().map(AgentState::snapshot).collect())
    }

    pub fn set_status(&mut self, handle: usize, status: AgentStatus) -> Result<(), AgentError> {
        self.get_mut(handle)?.status = status;
        Ok(())
    }

    /// Flags every listed agent DEADLOCKED. Finished agents are left alone.
    pub fn apply_deadlocks(&mut self, handles: &BTreeSet<usize>) -> Result<(), AgentError> {
        for &handle in handles {
            let agent = self.get_mut(handle)?;
            if agent.status != AgentStatus::Done {
                agent.status = AgentStatus::Deadlocked;
            }
        }
        Ok(())
    }

    /// Cells held by more than one on-map agent.
    ///
    /// Under normal operation this is empty; a violation means the environment
    /// missed a collision.
    pub fn occupancy_violations(&self) -> Vec<(Cell, Vec<usize>)> {
        let mut by_cell: BTreeMap<Cell, Vec<usize>> = BTreeMap::new();
        for agent in self.agents.iter().filter(|a| a.status.is_on_map()) {
            by_cell.entry(agent.position).or_default().push(agent.handle);
        }
        let violations: Vec<_> = by_cell.into_iter().filter(|(_, h)| h.len() > 1).collect();
        for (cell, handles) in &violations {
            tracing::warn!(%cell, ?handles, "Several agents occupy the same cell");
        }
        violations
    }

    /// Resets every agent to its initial state.
    pub fn reset(&mut self) {
        for agent in &mut self.agents {
            agent.reset();
        }
    }

    pub fn all_finished(&self) -> bool {
        self.agents
            .iter()
            .all(|a| matches!(a.status, AgentStatus::Done | AgentStatus::Deadlocked))
    }
}
