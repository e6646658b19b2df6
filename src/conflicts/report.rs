use std::collections::BTreeSet;

use crate::agents::StepSnapshot;
use crate::graph::TrackGraph;
use crate::prediction::PredictedTrajectory;

use super::conflict::{Conflict, ConflictKind};
use super::deadlock::{Deadlock, DeadlockDetector};
use super::detector::ConflictDetector;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Conflicts and deadlocks of one step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConflictReport {
    pub conflicts: Vec<Conflict>,
    pub deadlocks: Vec<Deadlock>,
    /// Agents that became deadlocked this step, cycle members and the agents
    /// trapped behind them. Agents already deadlocked are not repeated.
    pub newly_deadlocked: BTreeSet<usize>,
}

impl ConflictReport {
    /// Scans trajectories for conflicts, then runs deadlock analysis.
    pub fn analyze(
        graph: &TrackGraph,
        snapshot: &StepSnapshot,
        trajectories: &[PredictedTrajectory],
    ) -> Self {
        let conflicts = ConflictDetector::detect(trajectories);
        let analysis = DeadlockDetector::waits_for(graph, snapshot, trajectories, &conflicts).analyze();

        if !analysis.trapped.is_empty() {
            tracing::debug!(
                step = snapshot.step,
                cycles = analysis.cycles.len(),
                agents = ?analysis.trapped,
                "Deadlock detected"
            );
        }

        Self {
            conflicts,
            deadlocks: analysis.cycles,
            newly_deadlocked: analysis.trapped,
        }
    }

    /// Conflicts involving `handle`, earliest first.
    pub fn conflicts_of(&self, handle: usize) -> impl Iterator<Item = &Conflict> + '_ {
        self.conflicts.iter().filter(move |c| c.involves(handle))
    }

    pub fn count_of(&self, kind: ConflictKind) -> usize {
        self.conflicts.iter().filter(|c| c.kind == kind).count()
    }

    pub fn is_newly_deadlocked(&self, handle: usize) -> bool {
        self.newly_deadlocked.contains(&handle)
    }

    pub fn is_clear(&self) -> bool {
        self.conflicts.is_empty() && self.newly_deadlocked.is_empty()
    }
}
