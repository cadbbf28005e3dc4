//! Exploration strategies of DQN.
use crate::{error::DeepqError, Approximator, Mode};
use anyhow::Result;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::slice;

/// Epsilon-greedy action selection.
///
/// With probability `1 - epsilon` the action with the largest value is taken,
/// otherwise an action is drawn uniformly at random.
pub struct EpsilonGreedy {
    rng: SmallRng,
}

impl EpsilonGreedy {
    /// Constructs epsilon-greedy explorer.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Takes an action based on the action values of `obs` given by `q`.
    ///
    /// `q` is queried in [`Mode::Inference`] and put back in its previous
    /// mode before returning, whether the query succeeded or not.
    pub fn action<Q: Approximator>(
        &mut self,
        q: &mut Q,
        obs: &Q::Obs,
        epsilon: f64,
    ) -> Result<usize> {
        let u = self.rng.gen::<f64>();

        if u > epsilon {
            let prev_mode = q.mode();
            q.set_mode(Mode::Inference);
            let values = q.predict(slice::from_ref(obs));
            q.set_mode(prev_mode);

            let values = values?;
            let row = values.first().ok_or_else(|| DeepqError::ShapeMismatch {
                what: "action values".to_string(),
                expected: 1,
                actual: 0,
            })?;
            argmax(row)
        } else {
            Ok(self.rng.gen_range(0..q.n_actions()))
        }
    }
}

/// Returns the index of the largest value, the lowest index among ties.
pub fn argmax(values: &[f32]) -> Result<usize> {
    if values.is_empty() {
        return Err(DeepqError::ShapeMismatch {
            what: "action values".to_string(),
            expected: 1,
            actual: 0,
        }
        .into());
    }

    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    Ok(best)
}

/// Geometric decay of the exploration rate, applied once per episode.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct EpsilonDecay {
    /// Epsilon at the first episode.
    pub eps_start: f64,

    /// Lower bound of epsilon.
    pub eps_min: f64,

    /// Multiplicative decay factor.
    pub decay: f64,
}

impl Default for EpsilonDecay {
    fn default() -> Self {
        Self {
            eps_start: 1.0,
            eps_min: 0.01,
            decay: 0.995,
        }
    }
}

impl EpsilonDecay {
    /// Set the epsilon value at the start.
    pub fn eps_start(mut self, v: f64) -> Self {
        self.eps_start = v;
        self
    }

    /// Set the lower bound of epsilon.
    pub fn eps_min(mut self, v: f64) -> Self {
        self.eps_min = v;
        self
    }

    /// Set the decay factor.
    pub fn decay(mut self, v: f64) -> Self {
        self.decay = v;
        self
    }

    /// Returns the epsilon of the next episode: `max(eps_min, decay * eps)`.
    pub fn next(&self, eps: f64) -> f64 {
        (self.decay * eps).max(self.eps_min)
    }

    /// Checks that `0 <= eps_min <= eps_start <= 1` and `0 < decay <= 1`.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.eps_start) || !(0.0..=1.0).contains(&self.eps_min) {
            return Err(DeepqError::InvalidConfig(format!(
                "epsilon must lie in [0, 1], got eps_start = {}, eps_min = {}",
                self.eps_start, self.eps_min
            ))
            .into());
        }
        if self.eps_min > self.eps_start {
            return Err(DeepqError::InvalidConfig(format!(
                "eps_min ({}) exceeds eps_start ({})",
                self.eps_min, self.eps_start
            ))
            .into());
        }
        if !(self.decay > 0.0 && self.decay <= 1.0) {
            return Err(DeepqError::InvalidConfig(format!(
                "decay must lie in (0, 1], got {}",
                self.decay
            ))
            .into());
        }
        Ok(())
    }
}
