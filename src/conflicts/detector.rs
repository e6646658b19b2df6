//! Pairwise conflict scanning over predicted trajectories.

use std::collections::{BTreeSet, HashMap};

use crate::graph::Cell;
use crate::prediction::{PointState, PredictedTrajectory};

use super::conflict::{Conflict, ConflictKind, ConflictLocation};

/// Occupying agents per `(cell, timestep)`.
pub(crate) type OccupancyIndex = HashMap<(Cell, u32), Vec<(usize, PointState)>>;

/// Builds the `(cell, timestep) → agents` index in O(agents × horizon).
pub(crate) fn occupancy_index(trajectories: &[PredictedTrajectory]) -> OccupancyIndex {
    let mut index: OccupancyIndex = HashMap::new();
    for traj in trajectories {
        for p in traj.points.iter().filter(|p| p.state.occupies()) {
            index
                .entry((p.cell, p.timestep))
                .or_default()
                .push((traj.handle, p.state));
        }
    }
    index
}

/// Finds cell and edge conflicts among predicted trajectories.
pub struct ConflictDetector;

impl ConflictDetector {
    /// Returns every conflict, sorted and free of duplicates.
    ///
    /// The result does not depend on the order of `trajectories`.
    pub fn detect(trajectories: &[PredictedTrajectory]) -> Vec<Conflict> {
        let occupancy = occupancy_index(trajectories);
        let mut conflicts = BTreeSet::new();

        for (&(cell, timestep), occupants) in &occupancy {
            for (i, &(a, state_a)) in occupants.iter().enumerate() {
                for &(b, state_b) in &occupants[i + 1..] {
                    if a == b {
                        continue;
                    }
                    let kind = if state_a == PointState::Malfunctioning
                        || state_b == PointState::Malfunctioning
                    {
                        ConflictKind::MalfunctionBlock
                    } else {
                        ConflictKind::SameCell
                    };
                    conflicts.insert(Conflict::new(a, b, ConflictLocation::Cell(cell), timestep, kind));
                }
            }
        }

        let by_handle: HashMap<usize, &PredictedTrajectory> =
            trajectories.iter().map(|t| (t.handle, t)).collect();
        for traj in trajectories {
            for step in traj.points.windows(2) {
                let (from, to) = (&step[0], &step[1]);
                if from.cell == to.cell || !from.state.occupies() || !to.state.occupies() {
                    continue;
                }
                let Some(ahead) = occupancy.get(&(to.cell, from.timestep)) else {
                    continue;
                };
                for &(other, _) in ahead {
                    if other == traj.handle {
                        continue;
                    }
                    let swaps = by_handle
                        .get(&other)
                        .and_then(|t| t.occupied_cell(to.timestep))
                        == Some(from.cell);
                    if swaps {
                        conflicts.insert(Conflict::new(
                            traj.handle,
                            other,
                            ConflictLocation::edge(from.cell, to.cell),
                            from.timestep,
                            ConflictKind::HeadOn,
                        ));
                    }
                }
            }
        }

        tracing::trace!(conflicts = conflicts.len(), "Conflict scan finished");
        conflicts.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentStatus, AgentStore};
    use crate::graph::{straight_line, Direction, TrackGraph};
    use crate::prediction::TrajectoryPredictor;
    use Direction::*;

    fn predict(store: &AgentStore, n: u32, horizon: u32) -> Vec<PredictedTrajectory> {
        let graph = TrackGraph::build(&straight_line(n).unwrap()).unwrap();
        let mut store = store.clone();
        for a in store.iter_mut() {
            a.status = AgentStatus::Active;
        }
        TrajectoryPredictor::new(horizon).predict_all(&store.snapshot(0), &graph)
    }

    #[test]
    fn converging_agents_meet_in_middle_cell() {
        let mut store = AgentStore::new();
        store.add(Cell::new(0, 0), East, Cell::new(0, 2), 1.0).unwrap();
        store.add(Cell::new(0, 2), West, Cell::new(0, 0), 1.0).unwrap();
        let conflicts = ConflictDetector::detect(&predict(&store, 3, 2));
        assert!(conflicts.contains(&Conflict::new(
            0,
            1,
            ConflictLocation::Cell(Cell::new(0, 1)),
            1,
            ConflictKind::SameCell
        )));
        assert!(conflicts.iter().all(|c| c.kind != ConflictKind::HeadOn));
    }

    #[test]
    fn swap_is_head_on_not_same_cell() {
        let mut store = AgentStore::new();
        store.add(Cell::new(0, 1), East, Cell::new(0, 3), 1.0).unwrap();
        store.add(Cell::new(0, 2), West, Cell::new(0, 0), 1.0).unwrap();
        let conflicts = ConflictDetector::detect(&predict(&store, 4, 1));
        assert_eq!(
            conflicts,
            vec![Conflict::new(
                0,
                1,
                ConflictLocation::edge(Cell::new(0, 1), Cell::new(0, 2)),
                0,
                ConflictKind::HeadOn
            )]
        );
    }

    #[test]
    fn detection_is_order_independent() {
        let mut store = AgentStore::new();
        store.add(Cell::new(0, 0), East, Cell::new(0, 5), 1.0).unwrap();
        store.add(Cell::new(0, 4), West, Cell::new(0, 0), 1.0).unwrap();
        store.add(Cell::new(0, 5), West, Cell::new(0, 0), 0.5).unwrap();
        let trajectories = predict(&store, 6, 4);
        let expected = ConflictDetector::detect(&trajectories);
        assert!(!expected.is_empty());

        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        for order in orders {
            let permuted: Vec<_> = order.iter().map(|&i| trajectories[i].clone()).collect();
            assert_eq!(ConflictDetector::detect(&permuted), expected, "order {:?}", order);
        }
    }

    #[test]
    fn malfunctioning_occupant_yields_malfunction_block() {
        let mut store = AgentStore::new();
        store.add(Cell::new(0, 0), East, Cell::new(0, 3), 1.0).unwrap();
        store.add(Cell::new(0, 1), East, Cell::new(0, 3), 1.0).unwrap();
        store.get_mut(1).unwrap().malfunction = 3;
        let conflicts = ConflictDetector::detect(&predict(&store, 4, 2));
        assert!(conflicts.iter().any(|c| c.kind == ConflictKind::MalfunctionBlock
            && c.location == ConflictLocation::Cell(Cell::new(0, 1))
            && c.timestep == 1));
    }

    #[test]
    fn arrived_agents_leave_no_conflicts() {
        let mut store = AgentStore::new();
        store.add(Cell::new(0, 0), East, Cell::new(0, 1), 1.0).unwrap();
        store.add(Cell::new(0, 3), West, Cell::new(0, 2), 1.0).unwrap();
        let conflicts = ConflictDetector::detect(&predict(&store, 4, 4));
        assert!(conflicts.is_empty());
    }
}
