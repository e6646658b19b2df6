use thiserror::Error;

use crate::agents::AgentError;
use crate::config::ConfigError;
use crate::graph::{Cell, GraphError};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EnvError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid agent: {0}")]
    Agent(#[from] AgentError),

    #[error("Invalid layout: {0}")]
    Graph(#[from] GraphError),

    #[error("Agent {handle} references {cell}, which carries no track")]
    OffTrack { handle: usize, cell: Cell },

    #[error("Environment has no agents")]
    NoAgents,

    #[error("Episode already finished after {0} steps; call reset")]
    EpisodeFinished(u32),
}
