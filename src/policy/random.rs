//! Random policy for testing and baselines.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::trait_::Policy;
use crate::env::RailAction;
use crate::observer::StepObservation;

/// Uniformly random action selection.
///
/// Each observed agent independently draws one of the five actions. Used
/// for sanity checks and as a lower-bound baseline.
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn select_actions(&mut self, step: &StepObservation) -> BTreeMap<usize, RailAction> {
        let actions = RailAction::all();
        step.observations
            .keys()
            .map(|&h| (h, actions[self.rng.gen_range(0..actions.len())]))
            .collect()
    }

    fn name(&self) -> &str {
        "random"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentStore;
    use crate::config::ObserverConfig;
    use crate::graph::{straight_line, Cell, Direction, TrackGraph};
    use crate::observer::RailObserver;

    fn step() -> StepObservation {
        let graph = TrackGraph::build(&straight_line(5).unwrap()).unwrap();
        let mut store = AgentStore::new();
        for col in 0..4 {
            store
                .add(Cell::new(0, col), Direction::East, Cell::new(0, 4), 1.0)
                .unwrap();
        }
        RailObserver::new(ObserverConfig::default())
            .unwrap()
            .observe(&graph, &store.snapshot(0))
    }

    #[test]
    fn one_action_per_observed_agent() {
        let step = step();
        let actions = RandomPolicy::new(1).select_actions(&step);
        assert_eq!(actions.keys().copied().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn same_seed_same_actions() {
        let step = step();
        assert_eq!(
            RandomPolicy::new(9).select_actions(&step),
            RandomPolicy::new(9).select_actions(&step)
        );
    }
}
