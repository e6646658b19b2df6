//! Reference rail simulation driving the observation pipeline.
//!
//! Loop per step: apply actions in handle order → draw malfunctions →
//! snapshot → observe → apply deadlocks → check termination.

use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::agents::{AgentStatus, AgentStore, FRACTION_EPSILON};
use crate::config::EnvConfig;
use crate::graph::{Cell, Direction, TrackGraph};
use crate::observer::{RailObserver, StepObservation};

use super::action::RailAction;
use super::error::EnvError;

/// Result of a single environment step.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Observations, trajectories and conflicts after the step.
    pub observation: StepObservation,
    /// Agents that reached their target during this step.
    pub arrived: Vec<usize>,
    /// Agents flagged DEADLOCKED during this step.
    pub newly_deadlocked: BTreeSet<usize>,
    /// Whether the episode is over.
    pub done: bool,
    /// Steps taken so far.
    pub step: u32,
}

/// A flatland-style rail environment.
///
/// # Lifecycle
///
/// 1. Build the [`TrackGraph`] and an [`AgentStore`] of READY trains.
/// 2. Call [`RailEnvironment::new`] with the configuration and a seed.
/// 3. Call [`RailEnvironment::reset`] to start an episode.
/// 4. Call [`RailEnvironment::step`] with per-agent actions until `done`.
#[derive(Debug)]
pub struct RailEnvironment {
    pub config: EnvConfig,
    graph: TrackGraph,
    agents: AgentStore,
    observer: RailObserver,
    /// Whether each train keeps moving on `DoNothing`.
    moving: Vec<bool>,
    t: u32,
    done: bool,
    rng: StdRng,
    /// Seed for reproducible resets.
    seed: u64,
}

impl RailEnvironment {
    /// # Errors
    ///
    /// - `Config` if the configuration is invalid
    /// - `NoAgents` if the store is empty
    /// - `OffTrack` if an agent starts or ends on a cell without track
    pub fn new(
        graph: TrackGraph,
        agents: AgentStore,
        config: EnvConfig,
        seed: u64,
    ) -> Result<Self, EnvError> {
        config.validate()?;
        if agents.is_empty() {
            return Err(EnvError::NoAgents);
        }
        for agent in agents.iter() {
            for cell in [agent.initial_position, agent.target] {
                if !graph.contains(cell) {
                    return Err(EnvError::OffTrack {
                        handle: agent.handle,
                        cell,
                    });
                }
            }
        }
        let observer = RailObserver::new(config.observer.clone())?;
        Ok(Self {
            moving: vec![false; agents.len()],
            config,
            graph,
            agents,
            observer,
            t: 0,
            done: false,
            rng: StdRng::seed_from_u64(seed),
            seed,
        })
    }

    /// Starts a new episode: every agent READY at its initial cell.
    pub fn reset(&mut self) -> StepObservation {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.seed += 1; // different seed each episode
        self.t = 0;
        self.done = false;
        self.agents.reset();
        self.moving.iter_mut().for_each(|m| *m = false);
        tracing::debug!(agents = self.agents.len(), "Episode reset");
        self.observer.observe(&self.graph, &self.agents.snapshot(0))
    }

    /// Executes one step. Agents missing from `actions` do nothing.
    ///
    /// # Errors
    ///
    /// - `Agent(UnknownHandle)` if `actions` names an agent that does not exist
    /// - `EpisodeFinished` if the episode is already over
    #[tracing::instrument(level = "debug", skip_all, fields(step = self.t))]
    pub fn step(&mut self, actions: &BTreeMap<usize, RailAction>) -> Result<StepResult, EnvError> {
        if self.done {
            return Err(EnvError::EpisodeFinished(self.t));
        }
        for &handle in actions.keys() {
            self.agents.get(handle)?;
        }

        let mut arrived = Vec::new();
        for handle in 0..self.agents.len() {
            let action = actions.get(&handle).copied().unwrap_or_default();
            if self.advance(handle, action)? {
                arrived.push(handle);
            }
        }
        self.draw_malfunctions();
        self.t += 1;

        let snapshot = self.agents.snapshot(self.t);
        let observation = self.observer.observe(&self.graph, &snapshot);
        let newly_deadlocked = observation.report.newly_deadlocked.clone();
        self.agents.apply_deadlocks(&newly_deadlocked)?;
        self.agents.occupancy_violations();

        self.done = self.agents.all_finished() || self.t >= self.config.max_steps;
        if self.done {
            tracing::debug!(steps = self.t, "Episode finished");
        }

        Ok(StepResult {
            observation,
            arrived,
            newly_deadlocked,
            done: self.done,
            step: self.t,
        })
    }

    /// Applies `action` to one agent; returns whether it arrived.
    fn advance(&mut self, handle: usize, action: RailAction) -> Result<bool, EnvError> {
        let agent = self.agents.get(handle)?.clone();
        match agent.status {
            AgentStatus::Done | AgentStatus::Deadlocked => return Ok(false),
            AgentStatus::Ready => {
                if !action.is_move() || !self.is_free(agent.initial_position, handle) {
                    return Ok(false);
                }
                self.moving[handle] = true;
                let state = self.agents.get_mut(handle)?;
                state.status = AgentStatus::Active;
                state.position = state.initial_position;
                state.position_fraction = 0.0;
                if state.position == state.target {
                    state.status = AgentStatus::Done;
                    return Ok(true);
                }
                return Ok(false);
            }
            AgentStatus::Active => {}
        }

        if agent.malfunction > 0 {
            self.agents.get_mut(handle)?.malfunction -= 1;
            return Ok(false);
        }
        match action {
            RailAction::StopMoving => self.moving[handle] = false,
            a if a.is_move() => self.moving[handle] = true,
            _ => {}
        }
        if !self.moving[handle] {
            return Ok(false);
        }

        let fraction = (agent.position_fraction + agent.speed).min(1.0);
        if fraction + FRACTION_EPSILON < 1.0 {
            self.agents.get_mut(handle)?.position_fraction = fraction;
            return Ok(false);
        }

        let exit = self
            .pick_exit(agent.position, agent.direction, action)
            .filter(|(_, next)| self.is_free(*next, handle));
        let state = self.agents.get_mut(handle)?;
        let Some((heading, next)) = exit else {
            // Blocked or dead end: wait at the cell boundary.
            state.position_fraction = 1.0;
            return Ok(false);
        };
        state.position = next;
        state.direction = heading;
        state.position_fraction = 0.0;
        if next == state.target {
            state.status = AgentStatus::Done;
            tracing::debug!(handle, step = self.t + 1, "Agent arrived");
            return Ok(true);
        }
        Ok(false)
    }

    /// Exit requested by `action`, falling back to straight ahead, then the first exit.
    fn pick_exit(&self, cell: Cell, heading: Direction, action: RailAction) -> Option<(Direction, Cell)> {
        let exits = self.graph.neighbors(cell, heading);
        if exits.len() <= 1 {
            return exits.into_iter().next();
        }
        let find = |h: Direction| exits.iter().copied().find(|(o, _)| *o == h);
        action
            .preferred_heading(heading)
            .and_then(find)
            .or_else(|| find(heading))
            .or_else(|| exits.first().copied())
    }

    fn is_free(&self, cell: Cell, except: usize) -> bool {
        !self
            .agents
            .iter()
            .any(|a| a.handle != except && a.status.is_on_map() && a.position == cell)
    }

    fn draw_malfunctions(&mut self) {
        let rate = self.config.malfunction.rate;
        if rate <= 0.0 {
            return;
        }
        let (min, max) = (
            self.config.malfunction.min_duration,
            self.config.malfunction.max_duration,
        );
        for agent in self.agents.iter_mut() {
            if agent.status != AgentStatus::Active || agent.malfunction > 0 {
                continue;
            }
            if self.rng.gen_bool(rate) {
                agent.malfunction = self.rng.gen_range(min..=max);
                tracing::debug!(handle = agent.handle, turns = agent.malfunction, "Agent broke down");
            }
        }
    }

    pub fn graph(&self) -> &TrackGraph {
        &self.graph
    }

    pub fn agents(&self) -> &AgentStore {
        &self.agents
    }

    pub fn observer(&self) -> &RailObserver {
        &self.observer
    }

    pub fn step_count(&self) -> u32 {
        self.t
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn n_agents(&self) -> usize {
        self.agents.len()
    }
}
