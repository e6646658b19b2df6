//! Reference simulation driver.
//!
//! The observation core never mutates agents; this environment is the
//! "external" driver that applies actions, moves trains and feeds each step's
//! snapshot through the [`RailObserver`](crate::observer::RailObserver).

pub mod action;
pub mod environment;
pub mod error;

pub use action::RailAction;
pub use environment::{RailEnvironment, StepResult};
pub use error::EnvError;
