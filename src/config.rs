//! Configuration for the observation core and the reference environment.

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Shape of the observation handed to the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Representation {
    /// Fixed-length numeric feature list.
    #[default]
    Vector,
    /// Bounded local subgraph with node and edge feature tensors.
    Graph,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Prediction horizon must be positive")]
    ZeroHorizon,

    #[error("Feature radius must be positive")]
    ZeroRadius,

    #[error("Graph observations need at least one node slot")]
    ZeroMaxNodes,

    #[error("Padding value must be finite, got {0}")]
    NonFinitePadding(f64),

    #[error("Malfunction rate must lie in [0, 1], got {0}")]
    InvalidMalfunctionRate(f64),

    #[error("Malfunction duration range is empty: {min}..={max}")]
    InvalidMalfunctionDuration { min: u32, max: u32 },

    #[error("Episode must allow at least one step")]
    ZeroMaxSteps,
}

/// Configuration of the per-step observation pipeline.
///
/// Controls the prediction horizon, the observation representation and the
/// fixed sizes used to pad variable-length local structure.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObserverConfig {
    /// Number of future timesteps predicted per agent (H).
    pub horizon: u32,
    /// Vector or graph observations.
    pub representation: Representation,
    /// Look-ahead along each exit (vector) or subgraph depth (graph), in cells.
    pub radius: usize,
    /// Number of conflict slots in vector observations.
    pub max_conflicts: usize,
    /// Number of node slots in graph observations.
    pub max_nodes: usize,
    /// Value written into every padding slot.
    pub padding_value: f64,
}

impl ObserverConfig {
    /// Number of features describing the observed agent itself.
    pub const OWN_FEATURE_DIM: usize = 13; // dist, speed, fraction, status(4), malfunction, unreachable, halt, arrival, deadlock, conflicts

    /// Number of features per exit heading (four slots, N/E/S/W).
    pub const EXIT_FEATURE_DIM: usize = 7; // available, dist, same-heading agent, opposite agent, malfunction, crossing paths, head-on time

    /// Number of features per conflict slot.
    pub const CONFLICT_FEATURE_DIM: usize = 6; // present, kind(3), time, other deadlocked

    /// Number of features per subgraph node.
    pub const NODE_FEATURE_DIM: usize = 8;

    /// Number of features per subgraph edge.
    pub const EDGE_FEATURE_DIM: usize = 2; // connected, turn

    /// Length of a vector observation.
    pub fn vector_dim(&self) -> usize {
        Self::OWN_FEATURE_DIM
            + 4 * Self::EXIT_FEATURE_DIM
            + self.max_conflicts * Self::CONFLICT_FEATURE_DIM
    }

    /// Checks every option for a usable value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.horizon == 0 {
            return Err(ConfigError::ZeroHorizon);
        }
        if self.radius == 0 {
            return Err(ConfigError::ZeroRadius);
        }
        if self.representation == Representation::Graph && self.max_nodes == 0 {
            return Err(ConfigError::ZeroMaxNodes);
        }
        if !self.padding_value.is_finite() {
            return Err(ConfigError::NonFinitePadding(self.padding_value));
        }
        Ok(())
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            horizon: 10,
            representation: Representation::Vector,
            radius: 5,
            max_conflicts: 4,
            max_nodes: 16,
            padding_value: 0.0,
        }
    }
}

/// Random breakdown process of the reference environment.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MalfunctionConfig {
    /// Probability per step that a moving agent breaks down.
    pub rate: f64,
    pub min_duration: u32,
    pub max_duration: u32,
}

impl Default for MalfunctionConfig {
    fn default() -> Self {
        Self {
            rate: 0.0,
            min_duration: 2,
            max_duration: 6,
        }
    }
}

/// Configuration of the reference simulation driver.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnvConfig {
    /// Episode length cap.
    pub max_steps: u32,
    pub malfunction: MalfunctionConfig,
    pub observer: ObserverConfig,
}

impl EnvConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_steps == 0 {
            return Err(ConfigError::ZeroMaxSteps);
        }
        let m = &self.malfunction;
        if !(0.0..=1.0).contains(&m.rate) {
            return Err(ConfigError::InvalidMalfunctionRate(m.rate));
        }
        if m.min_duration > m.max_duration {
            return Err(ConfigError::InvalidMalfunctionDuration {
                min: m.min_duration,
                max: m.max_duration,
            });
        }
        self.observer.validate()
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            max_steps: 200,
            malfunction: MalfunctionConfig::default(),
            observer: ObserverConfig::default(),
        }
    }
}
