use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AgentError {
    #[error("Speed must lie in (0, 1], got {0}")]
    InvalidSpeed(f64),

    #[error("Unknown agent handle: {0}")]
    UnknownHandle(usize),
}
