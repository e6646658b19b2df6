//! Pairwise conflict detection and deadlock analysis over predicted trajectories.

pub mod conflict;
pub mod deadlock;
pub mod detector;
pub mod report;

pub use conflict::{Conflict, ConflictKind, ConflictLocation};
pub use deadlock::{Deadlock, DeadlockAnalysis, DeadlockDetector, WaitsFor};
pub use detector::ConflictDetector;
pub use report::ConflictReport;
