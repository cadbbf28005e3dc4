//! Transition.

/// One environment step `(o_t, a_t, r_t, o_t+1, is_terminated)` with
/// preprocessed observations.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<O> {
    /// Observation `o_t`.
    pub obs: O,

    /// Action `a_t`.
    pub act: usize,

    /// Reward `r_t`.
    pub reward: f32,

    /// Observation `o_t+1`.
    pub next_obs: O,

    /// `true` iff the episode ended on this transition.
    pub is_terminated: bool,
}

impl<O> Transition<O> {
    /// Constructs a transition.
    pub fn new(obs: O, act: usize, reward: f32, next_obs: O, is_terminated: bool) -> Self {
        Self {
            obs,
            act,
            reward,
            next_obs,
            is_terminated,
        }
    }
}
