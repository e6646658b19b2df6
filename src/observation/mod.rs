//! Per-agent observation encoding.
//!
//! Each encoder turns the step context (graph, snapshot, trajectories,
//! conflict report) into a fixed-shape observation for one agent. The shape
//! depends only on the [`ObserverConfig`], never on how many agents,
//! conflicts or track cells happen to be nearby.

pub mod features;
pub mod subgraph;
pub mod vector;

use std::collections::{BTreeSet, HashMap};

use crate::agents::{AgentSnapshot, AgentStatus, StepSnapshot};
use crate::config::{ObserverConfig, Representation};
use crate::conflicts::ConflictReport;
use crate::graph::{Cell, TrackGraph};
use crate::prediction::PredictedTrajectory;

pub use subgraph::{GraphEncoder, GraphObservation};
pub use vector::VectorEncoder;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Observation of one agent at one step.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Observation {
    Vector(Vec<f64>),
    Graph(GraphObservation),
}

impl Observation {
    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            Observation::Vector(v) => Some(v),
            Observation::Graph(_) => None,
        }
    }

    pub fn as_graph(&self) -> Option<&GraphObservation> {
        match self {
            Observation::Vector(_) => None,
            Observation::Graph(g) => Some(g),
        }
    }

    /// Total number of scalars.
    pub fn len(&self) -> usize {
        match self {
            Observation::Vector(v) => v.len(),
            Observation::Graph(g) => g.node_features.len() + g.edge_features.len() + g.mask.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether every scalar is a finite number.
    pub fn is_finite(&self) -> bool {
        match self {
            Observation::Vector(v) => v.iter().all(|x| x.is_finite()),
            Observation::Graph(g) => g
                .node_features
                .iter()
                .chain(&g.edge_features)
                .chain(&g.mask)
                .all(|x| x.is_finite()),
        }
    }
}

/// Everything an encoder may read for one step.
///
/// Built once per step; per-cell indices are shared by every agent's encoding.
pub struct EncodingContext<'a> {
    pub graph: &'a TrackGraph,
    pub snapshot: &'a StepSnapshot,
    pub trajectories: &'a [PredictedTrajectory],
    pub report: &'a ConflictReport,
    pub config: &'a ObserverConfig,
    occupants: HashMap<Cell, Vec<usize>>,
    visitors: HashMap<Cell, BTreeSet<usize>>,
}

impl<'a> EncodingContext<'a> {
    pub fn new(
        graph: &'a TrackGraph,
        snapshot: &'a StepSnapshot,
        trajectories: &'a [PredictedTrajectory],
        report: &'a ConflictReport,
        config: &'a ObserverConfig,
    ) -> Self {
        let mut occupants: HashMap<Cell, Vec<usize>> = HashMap::new();
        for agent in snapshot.iter().filter(|a| a.is_on_map()) {
            occupants.entry(agent.position).or_default().push(agent.handle);
        }
        let mut visitors: HashMap<Cell, BTreeSet<usize>> = HashMap::new();
        for traj in trajectories {
            for p in traj.points.iter().filter(|p| p.state.occupies()) {
                visitors.entry(p.cell).or_default().insert(traj.handle);
            }
        }
        Self {
            graph,
            snapshot,
            trajectories,
            report,
            config,
            occupants,
            visitors,
        }
    }

    pub fn agent(&self, handle: usize) -> Option<&'a AgentSnapshot> {
        self.snapshot.get(handle)
    }

    pub fn trajectory(&self, handle: usize) -> Option<&'a PredictedTrajectory> {
        self.trajectories
            .get(handle)
            .filter(|t| t.handle == handle)
            .or_else(|| self.trajectories.iter().find(|t| t.handle == handle))
    }

    /// On-map agents currently in `cell`.
    pub fn occupants(&self, cell: Cell) -> impl Iterator<Item = &'a AgentSnapshot> + '_ {
        self.occupants
            .get(&cell)
            .into_iter()
            .flatten()
            .filter_map(|&h| self.snapshot.get(h))
    }

    /// Agents whose predicted trajectory holds `cell` at some timestep.
    pub fn visitors(&self, cell: Cell) -> impl Iterator<Item = usize> + '_ {
        self.visitors.get(&cell).into_iter().flatten().copied()
    }

    /// Deadlocked before this step or detected as deadlocked in it.
    pub fn is_deadlocked(&self, handle: usize) -> bool {
        self.report.is_newly_deadlocked(handle)
            || self
                .agent(handle)
                .is_some_and(|a| a.status == AgentStatus::Deadlocked)
    }

    /// Upper end of the distance feature range.
    pub fn distance_scale(&self) -> f64 {
        self.graph.node_count().max(1) as f64
    }

    /// Upper end of agent-count features.
    pub fn agent_scale(&self) -> f64 {
        self.snapshot.remaining().max(1) as f64
    }
}

/// Encodes one agent's observation from the step context.
pub trait ObservationEncoder: Send + Sync {
    fn encode(&self, ctx: &EncodingContext<'_>, handle: usize) -> Observation;

    /// Number of scalars every observation of this encoder holds.
    fn output_len(&self) -> usize;
}

/// The configured representation.
#[derive(Debug, Clone)]
pub enum Encoder {
    Vector(VectorEncoder),
    Graph(GraphEncoder),
}

impl Encoder {
    pub fn from_config(config: &ObserverConfig) -> Self {
        match config.representation {
            Representation::Vector => Encoder::Vector(VectorEncoder::new(config)),
            Representation::Graph => Encoder::Graph(GraphEncoder::new(config)),
        }
    }
}

impl ObservationEncoder for Encoder {
    fn encode(&self, ctx: &EncodingContext<'_>, handle: usize) -> Observation {
        match self {
            Encoder::Vector(e) => e.encode(ctx, handle),
            Encoder::Graph(e) => e.encode(ctx, handle),
        }
    }

    fn output_len(&self) -> usize {
        match self {
            Encoder::Vector(e) => e.output_len(),
            Encoder::Graph(e) => e.output_len(),
        }
    }
}
