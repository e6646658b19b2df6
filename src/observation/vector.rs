//! Fixed-length feature vectors.
//!
//! Layout:
//! ```text
//! [own(13)] ++ [exit_N(7)] ++ [exit_E(7)] ++ [exit_S(7)] ++ [exit_W(7)]
//!           ++ [conflict_1(6)] ++ ... ++ [conflict_K(6)]
//! ```
//! Exit slots with no track and conflict slots beyond the agent's conflicts
//! are filled entirely with the padding value.

use crate::agents::{AgentSnapshot, AgentStatus};
use crate::config::ObserverConfig;
use crate::conflicts::ConflictKind;
use crate::graph::{Cell, Direction, Distance};
use crate::prediction::TrajectoryPredictor;

use super::features::{flag, min_max_scaling, steps};
use super::{EncodingContext, Observation, ObservationEncoder};

/// Encodes agents as flat vectors of scaled features.
#[derive(Debug, Clone)]
pub struct VectorEncoder {
    radius: usize,
    max_conflicts: usize,
    horizon: u32,
    padding: f64,
}

impl VectorEncoder {
    pub fn new(config: &ObserverConfig) -> Self {
        Self {
            radius: config.radius,
            max_conflicts: config.max_conflicts,
            horizon: config.horizon,
            padding: config.padding_value,
        }
    }

    fn own_features(&self, ctx: &EncodingContext<'_>, agent: &AgentSnapshot) -> Vec<f64> {
        let horizon = self.horizon as usize;
        let distance = ctx
            .graph
            .shortest_distance(agent.position, agent.direction, agent.target);
        let trajectory = ctx.trajectory(agent.handle);
        let conflicts = ctx.report.conflicts_of(agent.handle).count();

        let mut f = Vec::with_capacity(ObserverConfig::OWN_FEATURE_DIM);
        f.push(min_max_scaling(distance.as_f64(), 0.0, ctx.distance_scale()));
        f.push(min_max_scaling(agent.speed, 0.0, 1.0));
        f.push(min_max_scaling(agent.position_fraction, 0.0, 1.0));
        f.extend(AgentStatus::all().iter().map(|s| flag(*s == agent.status)));
        f.push(min_max_scaling(agent.malfunction as f64, 0.0, horizon as f64));
        f.push(flag(!distance.is_reachable()));
        f.push(steps(trajectory.and_then(|t| t.halted_at()), horizon));
        f.push(steps(trajectory.and_then(|t| t.arrival()), horizon));
        f.push(flag(ctx.is_deadlocked(agent.handle)));
        f.push(min_max_scaling(conflicts as f64, 0.0, ctx.agent_scale()));
        f
    }

    /// Cells ahead of `(start, heading)` following the predicted route, at most `radius`.
    fn look_ahead(
        &self,
        ctx: &EncodingContext<'_>,
        start: Cell,
        heading: Direction,
        target: Cell,
    ) -> Vec<(Cell, Direction)> {
        let mut path = vec![(start, heading)];
        let (mut cell, mut heading) = (start, heading);
        while path.len() < self.radius && cell != target {
            match TrajectoryPredictor::choose_exit(ctx.graph, cell, heading, target) {
                Some((next_heading, next)) => {
                    cell = next;
                    heading = next_heading;
                    path.push((cell, heading));
                }
                None => break,
            }
        }
        path
    }

    fn exit_features(
        &self,
        ctx: &EncodingContext<'_>,
        agent: &AgentSnapshot,
        heading: Direction,
        next: Cell,
    ) -> Vec<f64> {
        let horizon = self.horizon as f64;
        let path = self.look_ahead(ctx, next, heading, agent.target);

        let mut same_heading = None;
        let mut opposite = None;
        let mut worst_malfunction = 0u32;
        let mut crossing = std::collections::BTreeSet::new();
        for (k, &(cell, cell_heading)) in path.iter().enumerate() {
            let dist = k as u32 + 1;
            for other in ctx.occupants(cell).filter(|o| o.handle != agent.handle) {
                if other.direction == cell_heading {
                    same_heading.get_or_insert(dist);
                } else {
                    opposite.get_or_insert(dist);
                }
                worst_malfunction = worst_malfunction.max(other.malfunction);
            }
            crossing.extend(ctx.visitors(cell).filter(|&h| h != agent.handle));
        }

        // Earliest head-on this agent is predicted to meet along the exit.
        let head_on = ctx
            .report
            .conflicts_of(agent.handle)
            .filter(|c| c.kind == ConflictKind::HeadOn)
            .filter(|c| path.iter().any(|&(cell, _)| c.location.touches(cell)))
            .map(|c| c.timestep)
            .min();

        let via_exit = match ctx.graph.shortest_distance(next, heading, agent.target) {
            Distance::Steps(d) => Distance::Steps(d + 1),
            Distance::Unreachable => Distance::Unreachable,
        };

        vec![
            flag(ctx.occupants(next).all(|o| o.handle == agent.handle)),
            min_max_scaling(via_exit.as_f64(), 0.0, ctx.distance_scale()),
            steps(same_heading, self.radius),
            steps(opposite, self.radius),
            min_max_scaling(worst_malfunction as f64, 0.0, horizon),
            min_max_scaling(crossing.len() as f64, 0.0, ctx.agent_scale()),
            steps(head_on, self.horizon as usize),
        ]
    }

    fn padding_slot(&self, dim: usize) -> impl Iterator<Item = f64> {
        std::iter::repeat(self.padding).take(dim)
    }
}

impl ObservationEncoder for VectorEncoder {
    fn encode(&self, ctx: &EncodingContext<'_>, handle: usize) -> Observation {
        let Some(agent) = ctx.agent(handle) else {
            return Observation::Vector(self.padding_slot(self.output_len()).collect());
        };

        let mut obs = self.own_features(ctx, agent);

        let exits = ctx.graph.neighbors(agent.position, agent.direction);
        for heading in Direction::all() {
            match exits.iter().find(|(h, _)| *h == heading) {
                Some(&(h, next)) => obs.extend(self.exit_features(ctx, agent, h, next)),
                None => obs.extend(self.padding_slot(ObserverConfig::EXIT_FEATURE_DIM)),
            }
        }

        let mut conflicts: Vec<_> = ctx.report.conflicts_of(handle).collect();
        conflicts.sort_by_key(|c| (c.timestep, c.other(handle)));
        for i in 0..self.max_conflicts {
            match conflicts.get(i) {
                Some(c) => {
                    let other_deadlocked = c.other(handle).is_some_and(|o| ctx.is_deadlocked(o));
                    obs.push(flag(true));
                    obs.extend(c.kind.one_hot().iter().map(|&v| flag(v > 0.0)));
                    obs.push(min_max_scaling(c.timestep as f64, 0.0, self.horizon as f64));
                    obs.push(flag(other_deadlocked));
                }
                None => obs.extend(self.padding_slot(ObserverConfig::CONFLICT_FEATURE_DIM)),
            }
        }

        Observation::Vector(obs)
    }

    fn output_len(&self) -> usize {
        ObserverConfig::OWN_FEATURE_DIM
            + 4 * ObserverConfig::EXIT_FEATURE_DIM
            + self.max_conflicts * ObserverConfig::CONFLICT_FEATURE_DIM
    }
}
