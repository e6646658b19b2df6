//! Shortest-path baseline that reads vector observations.

use std::collections::BTreeMap;

use super::trait_::Policy;
use crate::config::ObserverConfig;
use crate::env::RailAction;
use crate::graph::Direction;
use crate::observation::features;
use crate::observer::StepObservation;

/// Follows the exit closest to the target and stops for oncoming trains.
///
/// Decodes the exit slots of the vector layout:
/// ```text
/// [own(13)] ++ [exit_N(7)] ++ [exit_E(7)] ++ [exit_S(7)] ++ [exit_W(7)] ++ ...
/// ```
/// Among the real exit slots it takes the one with the smallest scaled
/// distance (ties go to the lower heading index). If an opposite-heading
/// train sits on the first cell of that exit it stops instead. Graph
/// observations carry no exit slots; those agents move forward.
pub struct ShortestPathPolicy {
    padding: f64,
    adjacent: f64,
}

impl ShortestPathPolicy {
    pub fn new(config: &ObserverConfig) -> Self {
        Self {
            padding: config.padding_value,
            adjacent: features::steps(Some(1), config.radius),
        }
    }

    fn choose(&self, obs: &[f64], heading: Direction) -> RailAction {
        let own = ObserverConfig::OWN_FEATURE_DIM;
        let dim = ObserverConfig::EXIT_FEATURE_DIM;
        let Some(exits) = obs.get(own..own + 4 * dim) else {
            return RailAction::MoveForward;
        };

        let best = Direction::all()
            .into_iter()
            .zip(exits.chunks(dim))
            .filter(|(_, slot)| !slot.iter().all(|&v| v == self.padding))
            .min_by(|(a, sa), (b, sb)| sa[1].total_cmp(&sb[1]).then(a.index().cmp(&b.index())));

        match best {
            None => RailAction::MoveForward,
            Some((_, slot)) if slot[3] <= self.adjacent + 1e-9 => RailAction::StopMoving,
            Some((exit, _)) => RailAction::toward(heading, exit),
        }
    }
}

impl Policy for ShortestPathPolicy {
    fn select_actions(&mut self, step: &StepObservation) -> BTreeMap<usize, RailAction> {
        step.observations
            .iter()
            .map(|(&handle, obs)| {
                let heading = step
                    .trajectories
                    .iter()
                    .find(|t| t.handle == handle)
                    .and_then(|t| t.at(0))
                    .map(|p| p.heading);
                let action = match (obs.as_vector(), heading) {
                    (Some(v), Some(h)) => self.choose(v, h),
                    _ => RailAction::MoveForward,
                };
                (handle, action)
            })
            .collect()
    }

    fn name(&self) -> &str {
        "shortest-path"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentStatus, AgentStore};
    use crate::graph::{straight_line, Cell, LayoutBuilder, RailLayout, TrackGraph};
    use crate::observer::RailObserver;
    use Direction::*;

    fn observe(layout: &RailLayout, agents: &[(Cell, Direction, Cell)]) -> StepObservation {
        let graph = TrackGraph::build(layout).unwrap();
        let mut store = AgentStore::new();
        for &(cell, heading, target) in agents {
            let h = store.add(cell, heading, target, 1.0).unwrap();
            store.set_status(h, AgentStatus::Active).unwrap();
        }
        RailObserver::new(ObserverConfig::default())
            .unwrap()
            .observe(&graph, &store.snapshot(0))
    }

    #[test]
    fn straight_track_moves_forward() {
        let step = observe(&straight_line(5).unwrap(), &[(Cell::new(0, 0), East, Cell::new(0, 4))]);
        let actions = ShortestPathPolicy::new(&ObserverConfig::default()).select_actions(&step);
        assert_eq!(actions[&0], RailAction::MoveForward);
    }

    #[test]
    fn turns_at_switch_toward_target() {
        let layout = LayoutBuilder::new(3, 4)
            .add_line(&[Cell::new(0, 0), Cell::new(0, 1), Cell::new(0, 2), Cell::new(0, 3)])
            .unwrap()
            .add_line(&[Cell::new(0, 0), Cell::new(0, 1), Cell::new(1, 1), Cell::new(2, 1)])
            .unwrap()
            .build();
        let step = observe(&layout, &[(Cell::new(0, 1), East, Cell::new(2, 1))]);
        let actions = ShortestPathPolicy::new(&ObserverConfig::default()).select_actions(&step);
        assert_eq!(actions[&0], RailAction::MoveRight);
    }

    #[test]
    fn stops_for_adjacent_oncoming_train() {
        let step = observe(
            &straight_line(5).unwrap(),
            &[
                (Cell::new(0, 1), East, Cell::new(0, 4)),
                (Cell::new(0, 2), West, Cell::new(0, 0)),
            ],
        );
        let actions = ShortestPathPolicy::new(&ObserverConfig::default()).select_actions(&step);
        assert_eq!(actions[&0], RailAction::StopMoving);
        assert_eq!(actions[&1], RailAction::StopMoving);
    }
}
