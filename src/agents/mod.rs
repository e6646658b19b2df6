//! Agent state store.
//!
//! Agents are mutated once per step by the environment driver. The core
//! components never touch [`AgentState`] directly; they receive an
//! immutable [`StepSnapshot`] instead.

pub mod error;
pub mod state;
pub mod store;

pub use error::AgentError;
pub use state::{AgentSnapshot, AgentState, AgentStatus, FRACTION_EPSILON};
pub use store::{AgentStore, StepSnapshot};
