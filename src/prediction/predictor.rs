//! Greedy, deterministic trajectory prediction.

use crate::agents::{AgentSnapshot, AgentStatus, StepSnapshot, FRACTION_EPSILON};
use crate::graph::{Cell, Direction, TrackGraph};

use super::trajectory::{PointState, PredictedTrajectory, PredictionOutcome, TrajectoryPoint};

/// Projects every agent `horizon` steps ahead along the track graph.
///
/// The predictor does not simulate the policy: each agent keeps moving along
/// the single valid exit of its cell, and at switches it takes the exit that
/// minimises the remaining shortest distance to its target (ties broken by
/// heading index). Other agents are ignored; interactions are left to the
/// conflict detector.
#[derive(Debug, Clone, Copy)]
pub struct TrajectoryPredictor {
    horizon: u32,
}

impl TrajectoryPredictor {
    pub fn new(horizon: u32) -> Self {
        Self { horizon }
    }

    pub fn horizon(&self) -> u32 {
        self.horizon
    }

    /// Predicts the trajectory of one agent.
    ///
    /// The result holds `horizon + 1` points (timesteps `0..=horizon`) for
    /// agents on or about to enter the network, and none for finished agents.
    pub fn predict(&self, agent: &AgentSnapshot, graph: &TrackGraph) -> PredictedTrajectory {
        if agent.status == AgentStatus::Done {
            return PredictedTrajectory::inactive(agent.handle);
        }

        let horizon = self.horizon;
        let mut points = Vec::with_capacity(horizon as usize + 1);
        let mut cell = agent.position;
        let mut heading = agent.direction;
        let push = |points: &mut Vec<TrajectoryPoint>, cell: Cell, heading: Direction, state: PointState| {
            let timestep = points.len() as u32;
            points.push(TrajectoryPoint {
                timestep,
                cell,
                heading,
                state,
            });
        };
        let pad = |points: &mut Vec<TrajectoryPoint>, cell: Cell, heading: Direction, state: PointState| {
            while points.len() <= horizon as usize {
                push(points, cell, heading, state);
            }
        };

        if agent.status == AgentStatus::Deadlocked {
            pad(&mut points, cell, heading, PointState::Halted);
            return PredictedTrajectory {
                handle: agent.handle,
                points,
                outcome: PredictionOutcome::Halted { at: 0 },
            };
        }

        if cell == agent.target {
            push(&mut points, cell, heading, PointState::Arrived);
            pad(&mut points, cell, heading, PointState::AtTarget);
            return PredictedTrajectory {
                handle: agent.handle,
                points,
                outcome: PredictionOutcome::Arrived { at: 0 },
            };
        }

        let mut broken = agent.malfunction;
        let first_state = if broken > 0 {
            PointState::Malfunctioning
        } else {
            PointState::Moving
        };
        push(&mut points, cell, heading, first_state);

        let mut fraction = agent.position_fraction;
        let mut outcome = PredictionOutcome::Horizon;
        for t in 1..=horizon {
            if broken > 0 {
                broken -= 1;
                push(&mut points, cell, heading, PointState::Malfunctioning);
                continue;
            }

            fraction += agent.speed;
            if fraction + FRACTION_EPSILON < 1.0 {
                push(&mut points, cell, heading, PointState::Moving);
                continue;
            }

            match Self::choose_exit(graph, cell, heading, agent.target) {
                None => {
                    tracing::debug!(handle = agent.handle, %cell, timestep = t, "Prediction halted at dead end");
                    pad(&mut points, cell, heading, PointState::Halted);
                    outcome = PredictionOutcome::Halted { at: t };
                    break;
                }
                Some((next_heading, next_cell)) => {
                    fraction = (fraction - 1.0).max(0.0);
                    cell = next_cell;
                    heading = next_heading;
                    if cell == agent.target {
                        push(&mut points, cell, heading, PointState::Arrived);
                        pad(&mut points, cell, heading, PointState::AtTarget);
                        outcome = PredictionOutcome::Arrived { at: t };
                        break;
                    }
                    push(&mut points, cell, heading, PointState::Moving);
                }
            }
        }

        PredictedTrajectory {
            handle: agent.handle,
            points,
            outcome,
        }
    }

    /// Exit taken from `(cell, heading)`: the only one, or the one closest to `target`.
    pub fn choose_exit(
        graph: &TrackGraph,
        cell: Cell,
        heading: Direction,
        target: Cell,
    ) -> Option<(Direction, Cell)> {
        let exits = graph.neighbors(cell, heading);
        if exits.len() <= 1 {
            return exits.into_iter().next();
        }
        exits.into_iter().min_by_key(|(out, next)| {
            (graph.shortest_distance(*next, *out, target), out.index())
        })
    }

    /// Predicts every agent of the snapshot, in handle order.
    ///
    /// Each prediction reads only the shared graph and its own snapshot, so
    /// with the `parallel` feature the agents are spread over the rayon pool.
    /// Results are identical either way.
    pub fn predict_all(&self, snapshot: &StepSnapshot, graph: &TrackGraph) -> Vec<PredictedTrajectory> {
        #[cfg(not(feature = "parallel"))]
        {
            snapshot
                .iter()
                .map(|agent| self.predict(agent, graph))
                .collect()
        }

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;

            snapshot
                .agents()
                .par_iter()
                .map(|agent| self.predict(agent, graph))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentStore;
    use crate::graph::{straight_line, LayoutBuilder};
    use Direction::*;

    fn snapshot_of(store: &AgentStore, handle: usize, status: AgentStatus) -> AgentSnapshot {
        let mut snap = store.get(handle).unwrap().snapshot();
        snap.status = status;
        snap
    }

    fn line_graph(n: u32) -> TrackGraph {
        TrackGraph::build(&straight_line(n).unwrap()).unwrap()
    }

    #[test]
    fn two_cell_scenario_pads_at_target() {
        let graph = line_graph(2);
        let mut store = AgentStore::new();
        store.add(Cell::new(0, 0), East, Cell::new(0, 1), 1.0).unwrap();
        let agent = snapshot_of(&store, 0, AgentStatus::Active);

        let traj = TrajectoryPredictor::new(3).predict(&agent, &graph);
        let cells: Vec<Cell> = traj.cells().collect();
        assert_eq!(
            cells,
            vec![Cell::new(0, 0), Cell::new(0, 1), Cell::new(0, 1), Cell::new(0, 1)]
        );
        assert_eq!(traj.outcome, PredictionOutcome::Arrived { at: 1 });
        assert_eq!(traj.at(1).unwrap().state, PointState::Arrived);
        assert_eq!(traj.at(3).unwrap().state, PointState::AtTarget);
    }

    #[test]
    fn unit_speed_visits_one_new_cell_per_step() {
        let graph = line_graph(10);
        let mut store = AgentStore::new();
        store.add(Cell::new(0, 0), East, Cell::new(0, 9), 1.0).unwrap();
        let agent = snapshot_of(&store, 0, AgentStatus::Active);

        let traj = TrajectoryPredictor::new(6).predict(&agent, &graph);
        assert_eq!(traj.len(), 7);
        for (t, p) in traj.points.iter().enumerate() {
            assert_eq!(p.cell, Cell::new(0, t as u32));
        }
        assert_eq!(traj.outcome, PredictionOutcome::Horizon);
    }

    #[test]
    fn half_speed_waits_every_other_step() {
        let graph = line_graph(6);
        let mut store = AgentStore::new();
        store.add(Cell::new(0, 0), East, Cell::new(0, 5), 0.5).unwrap();
        let agent = snapshot_of(&store, 0, AgentStatus::Active);

        let traj = TrajectoryPredictor::new(4).predict(&agent, &graph);
        let cols: Vec<u32> = traj.cells().map(|c| c.col).collect();
        assert_eq!(cols, vec![0, 0, 1, 1, 2]);
    }

    #[test]
    fn third_speed_accumulates_without_drift() {
        let graph = line_graph(6);
        let mut store = AgentStore::new();
        store.add(Cell::new(0, 0), East, Cell::new(0, 5), 1.0 / 3.0).unwrap();
        let agent = snapshot_of(&store, 0, AgentStatus::Active);

        let traj = TrajectoryPredictor::new(6).predict(&agent, &graph);
        let cols: Vec<u32> = traj.cells().map(|c| c.col).collect();
        assert_eq!(cols, vec![0, 0, 0, 1, 1, 1, 2]);
    }

    #[test]
    fn dead_end_marks_remaining_slots_halted() {
        let graph = line_graph(3);
        let mut store = AgentStore::new();
        // Target behind the train: it runs into the far end of the line.
        store.add(Cell::new(0, 1), East, Cell::new(0, 0), 1.0).unwrap();
        let agent = snapshot_of(&store, 0, AgentStatus::Active);

        let traj = TrajectoryPredictor::new(4).predict(&agent, &graph);
        assert_eq!(traj.outcome, PredictionOutcome::Halted { at: 2 });
        assert_eq!(traj.len(), 5);
        for t in 2..=4 {
            let p = traj.at(t).unwrap();
            assert_eq!(p.state, PointState::Halted);
            assert_eq!(p.cell, Cell::new(0, 2));
        }
    }

    #[test]
    fn malfunction_delays_departure() {
        let graph = line_graph(5);
        let mut store = AgentStore::new();
        store.add(Cell::new(0, 0), East, Cell::new(0, 4), 1.0).unwrap();
        let mut agent = snapshot_of(&store, 0, AgentStatus::Active);
        agent.malfunction = 2;

        let traj = TrajectoryPredictor::new(3).predict(&agent, &graph);
        let states: Vec<PointState> = traj.points.iter().map(|p| p.state).collect();
        assert_eq!(
            states,
            vec![
                PointState::Malfunctioning,
                PointState::Malfunctioning,
                PointState::Malfunctioning,
                PointState::Moving
            ]
        );
        assert_eq!(traj.at(3).unwrap().cell, Cell::new(0, 1));
    }

    #[test]
    fn done_agents_have_no_trajectory() {
        let graph = line_graph(3);
        let mut store = AgentStore::new();
        store.add(Cell::new(0, 0), East, Cell::new(0, 2), 1.0).unwrap();
        let agent = snapshot_of(&store, 0, AgentStatus::Done);
        let traj = TrajectoryPredictor::new(3).predict(&agent, &graph);
        assert!(traj.is_empty());
        assert_eq!(traj.outcome, PredictionOutcome::Inactive);
    }

    #[test]
    fn deadlocked_agents_stay_put() {
        let graph = line_graph(3);
        let mut store = AgentStore::new();
        store.add(Cell::new(0, 1), East, Cell::new(0, 2), 1.0).unwrap();
        let agent = snapshot_of(&store, 0, AgentStatus::Deadlocked);
        let traj = TrajectoryPredictor::new(2).predict(&agent, &graph);
        assert!(traj
            .points
            .iter()
            .all(|p| p.state == PointState::Halted && p.cell == Cell::new(0, 1)));
    }

    #[test]
    fn switch_takes_branch_toward_target() {
        let layout = LayoutBuilder::new(3, 4)
            .add_line(&[Cell::new(0, 0), Cell::new(0, 1), Cell::new(0, 2), Cell::new(0, 3)])
            .unwrap()
            .add_line(&[Cell::new(0, 0), Cell::new(0, 1), Cell::new(1, 1), Cell::new(2, 1)])
            .unwrap()
            .build();
        let graph = TrackGraph::build(&layout).unwrap();
        let mut store = AgentStore::new();
        store.add(Cell::new(0, 0), East, Cell::new(2, 1), 1.0).unwrap();
        store.add(Cell::new(0, 0), East, Cell::new(0, 3), 1.0).unwrap();
        let predictor = TrajectoryPredictor::new(3);

        let south = predictor.predict(&snapshot_of(&store, 0, AgentStatus::Active), &graph);
        assert_eq!(south.at(2).unwrap().cell, Cell::new(1, 1));
        let east = predictor.predict(&snapshot_of(&store, 1, AgentStatus::Active), &graph);
        assert_eq!(east.at(2).unwrap().cell, Cell::new(0, 2));
    }

    #[test]
    fn loop_prediction_is_bounded_by_horizon() {
        let ring = [
            Cell::new(0, 0),
            Cell::new(0, 1),
            Cell::new(1, 1),
            Cell::new(1, 0),
        ];
        let layout = LayoutBuilder::new(3, 3).add_loop(&ring).unwrap().build();
        let graph = TrackGraph::build(&layout).unwrap();
        let mut store = AgentStore::new();
        // Clockwise from the top-left corner; target off the ring.
        store.add(Cell::new(0, 0), North, Cell::new(2, 2), 1.0).unwrap();
        let agent = snapshot_of(&store, 0, AgentStatus::Active);
        let traj = TrajectoryPredictor::new(50).predict(&agent, &graph);
        assert_eq!(traj.len(), 51);
        assert_eq!(traj.outcome, PredictionOutcome::Horizon);
    }

    #[test]
    fn prediction_is_deterministic() {
        let graph = line_graph(8);
        let mut store = AgentStore::new();
        store.add(Cell::new(0, 2), East, Cell::new(0, 7), 0.5).unwrap();
        store.add(Cell::new(0, 6), West, Cell::new(0, 0), 1.0).unwrap();
        let snapshot = store.snapshot(0);
        let predictor = TrajectoryPredictor::new(5);
        assert_eq!(
            predictor.predict_all(&snapshot, &graph),
            predictor.predict_all(&snapshot, &graph)
        );
    }
}
