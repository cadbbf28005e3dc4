//! Environment.
use super::Step;
use anyhow::Result;
use std::fmt::Debug;

/// Represents an environment with a discrete action space, typically an MDP.
///
/// Actions are indices in `0..n_actions()`.
pub trait Env {
    /// Configurations.
    type Config: Clone;

    /// Raw observation emitted by the environment, before preprocessing.
    type Obs: Clone + Debug;

    /// Builds an environment with a given random seed.
    fn build(config: &Self::Config, seed: i64) -> Result<Self>
    where
        Self: Sized;

    /// The number of actions.
    fn n_actions(&self) -> usize;

    /// Starts a new episode and returns its initial observation.
    fn reset(&mut self) -> Result<Self::Obs>;

    /// Performs an environment step.
    fn step(&mut self, act: usize) -> Result<Step<Self>>
    where
        Self: Sized;
}
