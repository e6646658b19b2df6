//! railcast - per-step trajectory prediction, conflict detection and
//! observation encoding for multi-agent rail routing.
//!
//! Each simulation step runs the same pipeline:
//!
//! 1. The environment takes a [`StepSnapshot`] of every train.
//! 2. [`TrajectoryPredictor`] projects each train `H` steps ahead on the
//!    static [`TrackGraph`].
//! 3. [`ConflictReport::analyze`] finds same-cell, head-on and
//!    malfunction-block conflicts, then deadlock cycles.
//! 4. An [`Encoder`] turns all of it into one fixed-shape [`Observation`] per
//!    train for the policy.
//!
//! [`RailObserver`] bundles steps 2-4; [`RailEnvironment`] is a reference
//! driver that applies policy actions and closes the loop.

pub mod agents;
pub mod config;
pub mod conflicts;
pub mod env;
pub mod graph;
pub mod observation;
pub mod observer;
pub mod policy;
pub mod prediction;

pub use agents::{AgentSnapshot, AgentState, AgentStatus, AgentStore, StepSnapshot};
pub use config::{ConfigError, EnvConfig, MalfunctionConfig, ObserverConfig, Representation};
pub use conflicts::{Conflict, ConflictKind, ConflictLocation, ConflictReport, Deadlock};
pub use env::{EnvError, RailAction, RailEnvironment, StepResult};
pub use graph::{Cell, Direction, Distance, GraphError, LayoutBuilder, RailLayout, TrackGraph};
pub use observation::{Encoder, Observation, ObservationEncoder};
pub use observer::{AgentAnomaly, RailObserver, StepObservation};
pub use policy::{Policy, RandomPolicy, ShortestPathPolicy};
pub use prediction::{PredictedTrajectory, TrajectoryPredictor};
