//! Per-step pipeline: predict every agent, detect conflicts, encode observations.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::agents::{AgentStatus, StepSnapshot};
use crate::config::{ConfigError, ObserverConfig};
use crate::conflicts::ConflictReport;
use crate::graph::{Cell, TrackGraph};
use crate::observation::{Encoder, EncodingContext, Observation, ObservationEncoder};
use crate::prediction::{PredictedTrajectory, TrajectoryPredictor};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Non-fatal per-agent conditions reported alongside the observations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AgentAnomaly {
    #[error("Agent {handle} cannot reach its target from its current position")]
    UnreachableTarget { handle: usize },

    #[error("Prediction for agent {handle} halted at {cell} (t={timestep})")]
    PredictionHalted {
        handle: usize,
        timestep: u32,
        cell: Cell,
    },
}

impl AgentAnomaly {
    pub fn handle(&self) -> usize {
        match self {
            AgentAnomaly::UnreachableTarget { handle } => *handle,
            AgentAnomaly::PredictionHalted { handle, .. } => *handle,
        }
    }
}

/// Everything produced for one step.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StepObservation {
    pub step: u32,
    /// One entry per agent that has not finished.
    pub observations: BTreeMap<usize, Observation>,
    /// Predicted trajectories in handle order, for rendering consumers.
    pub trajectories: Vec<PredictedTrajectory>,
    pub report: ConflictReport,
    pub anomalies: Vec<AgentAnomaly>,
}

/// Runs prediction, conflict detection and encoding for one step.
#[derive(Debug, Clone)]
pub struct RailObserver {
    config: ObserverConfig,
    predictor: TrajectoryPredictor,
    encoder: Encoder,
}

impl RailObserver {
    pub fn new(config: ObserverConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            predictor: TrajectoryPredictor::new(config.horizon),
            encoder: Encoder::from_config(&config),
            config,
        })
    }

    pub fn config(&self) -> &ObserverConfig {
        &self.config
    }

    /// Number of scalars in every observation this observer produces.
    pub fn observation_len(&self) -> usize {
        self.encoder.output_len()
    }

    #[tracing::instrument(level = "debug", skip_all, fields(step = snapshot.step, agents = snapshot.len()))]
    pub fn observe(&self, graph: &TrackGraph, snapshot: &StepSnapshot) -> StepObservation {
        let trajectories = self.predictor.predict_all(snapshot, graph);
        let report = ConflictReport::analyze(graph, snapshot, &trajectories);
        let anomalies = Self::anomalies(graph, snapshot, &trajectories);

        let observations = {
            let ctx = EncodingContext::new(graph, snapshot, &trajectories, &report, &self.config);
            let handles: Vec<usize> = snapshot
                .iter()
                .filter(|a| a.status != AgentStatus::Done)
                .map(|a| a.handle)
                .collect();
            self.encode_all(&ctx, &handles)
        };

        tracing::trace!(
            conflicts = report.conflicts.len(),
            deadlocked = report.newly_deadlocked.len(),
            anomalies = anomalies.len(),
            "Step observed"
        );

        StepObservation {
            step: snapshot.step,
            observations,
            trajectories,
            report,
            anomalies,
        }
    }

    fn encode_all(&self, ctx: &EncodingContext<'_>, handles: &[usize]) -> BTreeMap<usize, Observation> {
        #[cfg(not(feature = "parallel"))]
        {
            handles
                .iter()
                .map(|&h| (h, self.encoder.encode(ctx, h)))
                .collect()
        }

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;

            handles
                .par_iter()
                .map(|&h| (h, self.encoder.encode(ctx, h)))
                .collect::<Vec<_>>()
                .into_iter()
                .collect()
        }
    }

    fn anomalies(
        graph: &TrackGraph,
        snapshot: &StepSnapshot,
        trajectories: &[PredictedTrajectory],
    ) -> Vec<AgentAnomaly> {
        let mut anomalies = Vec::new();
        for agent in snapshot.iter().filter(|a| a.status != AgentStatus::Done) {
            if !graph
                .shortest_distance(agent.position, agent.direction, agent.target)
                .is_reachable()
            {
                tracing::debug!(handle = agent.handle, position = %agent.position, target = %agent.target, "Target unreachable");
                anomalies.push(AgentAnomaly::UnreachableTarget {
                    handle: agent.handle,
                });
            }
        }
        for traj in trajectories {
            let deadlocked = snapshot
                .get(traj.handle)
                .is_some_and(|a| a.status == AgentStatus::Deadlocked);
            if deadlocked {
                continue;
            }
            if let Some(timestep) = traj.halted_at() {
                if let Some(point) = traj.at(timestep) {
                    anomalies.push(AgentAnomaly::PredictionHalted {
                        handle: traj.handle,
                        timestep,
                        cell: point.cell,
                    });
                }
            }
        }
        anomalies
    }
}
