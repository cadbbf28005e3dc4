//! Agent.
use super::Env;
use crate::record::Record;
use anyhow::Result;
use std::path::Path;

/// Represents a trainable policy on an environment.
pub trait Agent<E: Env> {
    /// Selects an action for the given observation, exploring with
    /// probability `epsilon`.
    fn select_action(&mut self, obs: &E::Obs, epsilon: f64) -> Result<usize>;

    /// Stores the transition `(o_t, a_t, r_t, o_t+1, is_terminated)` and,
    /// if enough transitions have been collected, performs an optimization step.
    ///
    /// Returns a record of the optimization step if it was done.
    fn observe_transition(
        &mut self,
        obs: &E::Obs,
        act: usize,
        reward: f32,
        next_obs: &E::Obs,
        is_terminated: bool,
    ) -> Result<Option<Record>>;

    /// Save the parameters of the agent in the given directory.
    fn save_params(&self, path: &Path) -> Result<()>;

    /// Load the parameters of the agent from the given directory.
    fn load_params(&mut self, path: &Path) -> Result<()>;
}
