//! Deadlock detection on the waits-for relation between stuck agents.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;

use crate::agents::{AgentStatus, StepSnapshot};
use crate::graph::{Cell, Direction, TrackGraph};
use crate::prediction::PredictedTrajectory;

use super::conflict::Conflict;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A set of agents that wait on each other in a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Deadlock {
    /// Members in ascending handle order.
    pub agents: Vec<usize>,
}

impl Deadlock {
    pub fn contains(&self, handle: usize) -> bool {
        self.agents.binary_search(&handle).is_ok()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// Outcome of a waits-for analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeadlockAnalysis {
    /// Cycles, sorted by their smallest member.
    pub cycles: Vec<Deadlock>,
    /// Every agent that can no longer move: cycle members plus agents whose
    /// every exit is held by a deadlocked agent.
    pub trapped: BTreeSet<usize>,
}

/// "Agent waits for agent" relation, one blocker list per exit.
///
/// An agent is recorded only when every one of its exits is blocked. The
/// relation is built from sets and ordered maps, so the analysis result does
/// not depend on the order in which agents were added.
#[derive(Debug, Clone, Default)]
pub struct WaitsFor {
    stuck: BTreeMap<usize, Vec<BTreeSet<usize>>>,
    deadlocked: BTreeSet<usize>,
}

impl WaitsFor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `agent` as unable to move: each entry of `exits` lists the
    /// agents blocking one of its exits.
    pub fn add_stuck<E, B>(&mut self, agent: usize, exits: E)
    where
        E: IntoIterator<Item = B>,
        B: IntoIterator<Item = usize>,
    {
        let exits: Vec<BTreeSet<usize>> = exits
            .into_iter()
            .map(|blockers| blockers.into_iter().filter(|&b| b != agent).collect())
            .collect();
        self.stuck.insert(agent, exits);
    }

    /// Records an agent already known to be deadlocked from an earlier step.
    pub fn add_deadlocked(&mut self, agent: usize) {
        self.deadlocked.insert(agent);
    }

    pub fn is_stuck(&self, agent: usize) -> bool {
        self.stuck.contains_key(&agent)
    }

    pub fn stuck_count(&self) -> usize {
        self.stuck.len()
    }

    /// Agents blocking `agent` on any exit.
    pub fn blockers(&self, agent: usize) -> BTreeSet<usize> {
        self.stuck
            .get(&agent)
            .map(|exits| exits.iter().flatten().copied().collect())
            .unwrap_or_default()
    }

    /// Finds agents that can never move again and the cycles among them.
    ///
    /// Starting from all stuck agents, repeatedly releases any agent with an
    /// exit whose blockers are all free to move; what remains is trapped.
    /// Cycles are the strongly connected components of the relation
    /// restricted to trapped agents.
    pub fn analyze(&self) -> DeadlockAnalysis {
        let mut trapped: BTreeSet<usize> = self
            .stuck
            .iter()
            .filter(|(_, exits)| !exits.is_empty() && exits.iter().all(|b| !b.is_empty()))
            .map(|(&a, _)| a)
            .collect();

        loop {
            let released: Vec<usize> = trapped
                .iter()
                .copied()
                .filter(|a| {
                    self.stuck[a].iter().any(|blockers| {
                        !blockers
                            .iter()
                            .any(|b| trapped.contains(b) || self.deadlocked.contains(b))
                    })
                })
                .collect();
            if released.is_empty() {
                break;
            }
            for a in released {
                trapped.remove(&a);
            }
        }

        let mut waits: DiGraphMap<usize, ()> = DiGraphMap::new();
        for &a in &trapped {
            waits.add_node(a);
            for b in self.blockers(a) {
                if trapped.contains(&b) {
                    waits.add_edge(a, b, ());
                }
            }
        }

        let mut cycles: Vec<Deadlock> = tarjan_scc(&waits)
            .into_iter()
            .filter(|scc| scc.len() > 1 || waits.contains_edge(scc[0], scc[0]))
            .map(|mut agents| {
                agents.sort_unstable();
                Deadlock { agents }
            })
            .collect();
        cycles.sort();

        DeadlockAnalysis { cycles, trapped }
    }
}

/// Builds the waits-for relation of one step.
pub struct DeadlockDetector;

impl DeadlockDetector {
    /// An active agent is stuck when every exit of its current cell is held
    /// by another on-map agent, or is contested by an on-map agent predicted
    /// to enter it at `t = 1` from the opposite side. A contested cell only
    /// blocks when every way on from it leads into the rival's current cell;
    /// at a switch with a free branch the rival can still get out of the way.
    /// Agents already marked deadlocked count as permanent blockers.
    pub fn waits_for(
        graph: &TrackGraph,
        snapshot: &StepSnapshot,
        trajectories: &[PredictedTrajectory],
        conflicts: &[Conflict],
    ) -> WaitsFor {
        let mut occupants: HashMap<Cell, Vec<usize>> = HashMap::new();
        for agent in snapshot.iter().filter(|a| a.is_on_map()) {
            occupants.entry(agent.position).or_default().push(agent.handle);
        }

        let positions: HashMap<usize, Cell> = snapshot
            .iter()
            .filter(|a| a.is_on_map())
            .map(|a| (a.handle, a.position))
            .collect();

        let mut oncoming: HashMap<Cell, Vec<(usize, Direction)>> = HashMap::new();
        for traj in trajectories.iter().filter(|t| positions.contains_key(&t.handle)) {
            if let Some(p) = traj.at(1).filter(|p| p.state.occupies()) {
                oncoming.entry(p.cell).or_default().push((traj.handle, p.heading));
            }
        }

        let conflicting: HashSet<(usize, usize)> = conflicts
            .iter()
            .map(|c| (c.agent_a, c.agent_b))
            .collect();
        let in_conflict = |a: usize, b: usize| conflicting.contains(&(a.min(b), a.max(b)));

        let mut relation = WaitsFor::new();
        for agent in snapshot.iter() {
            match agent.status {
                AgentStatus::Deadlocked => {
                    relation.add_deadlocked(agent.handle);
                    continue;
                }
                AgentStatus::Active => {}
                _ => continue,
            }

            let exits = graph.neighbors(agent.position, agent.direction);
            if exits.is_empty() {
                continue;
            }
            let mut blocked = Vec::with_capacity(exits.len());
            for (heading, next) in exits {
                let onward = graph.neighbors(next, heading);
                let cornered_by = |rival: usize| {
                    positions
                        .get(&rival)
                        .is_some_and(|&at| onward.iter().all(|&(_, cell)| cell == at))
                };
                let mut blockers: Vec<usize> = occupants
                    .get(&next)
                    .into_iter()
                    .flatten()
                    .copied()
                    .filter(|&b| b != agent.handle)
                    .collect();
                blockers.extend(
                    oncoming
                        .get(&next)
                        .into_iter()
                        .flatten()
                        .filter(|(b, h)| {
                            *b != agent.handle
                                && *h == heading.opposite()
                                && in_conflict(agent.handle, *b)
                                && cornered_by(*b)
                        })
                        .map(|(b, _)| *b),
                );
                if blockers.is_empty() {
                    blocked.clear();
                    break;
                }
                blocked.push(blockers);
            }
            if !blocked.is_empty() {
                relation.add_stuck(agent.handle, blocked);
            }
        }

        tracing::trace!(stuck = relation.stuck_count(), "Waits-for relation built");
        relation
    }
}
