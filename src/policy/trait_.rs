//! Policy trait for the rail environment.

use std::collections::BTreeMap;

use crate::env::RailAction;
use crate::observer::StepObservation;

/// A policy that selects actions for agents based on observations.
///
/// Agents absent from the returned map do nothing this step.
pub trait Policy: Send + Sync {
    /// Selects one action per observed agent.
    ///
    /// # Arguments
    ///
    /// * `step` - Observations of every unfinished agent, plus the
    ///   trajectories and conflict report they were built from
    fn select_actions(&mut self, step: &StepObservation) -> BTreeMap<usize, RailAction>;

    /// Returns a human-readable name for this policy.
    fn name(&self) -> &str;
}
