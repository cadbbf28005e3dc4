//! Environment step.
use super::Env;

/// Represents an action, observation and reward tuple `(a_t, o_t+1, r_t)`.
///
/// An environment emits a [`Step`] object at every interaction step.
pub struct Step<E: Env> {
    /// Action.
    pub act: usize,

    /// Observation.
    pub obs: E::Obs,

    /// Reward.
    pub reward: f32,

    /// Flag denoting if the episode is terminated.
    pub is_terminated: bool,

    /// Flag denoting if the episode is truncated, e.g., by a time limit of
    /// the environment itself. A truncated step does not stop bootstrapping.
    pub is_truncated: bool,
}

impl<E: Env> Step<E> {
    /// Constructs a [`Step`] object.
    pub fn new(
        obs: E::Obs,
        act: usize,
        reward: f32,
        is_terminated: bool,
        is_truncated: bool,
    ) -> Self {
        Step {
            act,
            obs,
            reward,
            is_terminated,
            is_truncated,
        }
    }

    #[inline]
    /// Terminated or truncated.
    pub fn is_done(&self) -> bool {
        self.is_terminated || self.is_truncated
    }
}
