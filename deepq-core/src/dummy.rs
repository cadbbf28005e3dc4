//! Test doubles of the collaborators of the agent.
//!
//! [`LinearQ`] is a linear action-value function trained with plain SGD,
//! [`CountingEnv`] an environment with fixed-length episodes and
//! [`IdentityPreprocessor`] passes observations through. They are used in
//! the tests of this crate and of crates building on it.
use crate::{learner::CriticLoss, Approximator, Env, Mode, Preprocessor, Step};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::{
    cell::Cell,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Parameters of [`LinearQ`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LinearParams {
    /// Weights, one row per action.
    pub w: Vec<Vec<f32>>,

    /// Biases, one per action.
    pub b: Vec<f32>,
}

/// Output of the forward pass and of the loss of [`LinearQ`].
pub enum LinearTensor {
    /// Action values together with the inputs producing them.
    Values {
        /// Inputs.
        obs: Vec<Vec<f32>>,
        /// Action values.
        values: Vec<Vec<f32>>,
    },

    /// A loss value with the gradients of the parameters.
    Loss {
        /// Loss.
        value: f32,
        /// Gradients.
        grad: LinearParams,
    },
}

/// Linear action-value function `q(o) = W o + b`.
#[derive(Debug, Clone)]
pub struct LinearQ {
    params: LinearParams,
    lr: f32,
    mode: Mode,
    last_predict_mode: Cell<Option<Mode>>,
}

impl LinearQ {
    /// A function with zero parameters.
    pub fn new(dim: usize, n_actions: usize) -> Self {
        Self::constant(dim, vec![0.0; n_actions])
    }

    /// A function returning `values` for every observation of dimension `dim`.
    pub fn constant(dim: usize, values: Vec<f32>) -> Self {
        Self {
            params: LinearParams {
                w: vec![vec![0.0; dim]; values.len()],
                b: values,
            },
            lr: 0.01,
            mode: Mode::Train,
            last_predict_mode: Cell::new(None),
        }
    }

    /// Sets the learning rate.
    pub fn learning_rate(mut self, lr: f32) -> Self {
        self.lr = lr;
        self
    }

    /// Returns a copy of the parameters.
    pub fn params(&self) -> LinearParams {
        self.params.clone()
    }

    /// The mode in which [`Approximator::predict`] was last called, if ever.
    pub fn last_predict_mode(&self) -> Option<Mode> {
        self.last_predict_mode.get()
    }

    fn values(&self, obs: &[f32]) -> Result<Vec<f32>> {
        let dim = self.params.w.first().map_or(0, |w| w.len());
        if obs.len() != dim {
            bail!("Observation of length {} given to LinearQ of dimension {}", obs.len(), dim);
        }
        Ok(self
            .params
            .w
            .iter()
            .zip(self.params.b.iter())
            .map(|(w, b)| w.iter().zip(obs.iter()).map(|(w, x)| w * x).sum::<f32>() + b)
            .collect())
    }
}

impl Approximator for LinearQ {
    type Obs = Vec<f32>;
    type Tensor = LinearTensor;

    fn n_actions(&self) -> usize {
        self.params.b.len()
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    fn predict(&self, obs: &[Self::Obs]) -> Result<Vec<Vec<f32>>> {
        self.last_predict_mode.set(Some(self.mode));
        obs.iter().map(|o| self.values(o)).collect()
    }

    fn forward_with_grad(&self, obs: &[Self::Obs]) -> Result<Self::Tensor> {
        let values = obs.iter().map(|o| self.values(o)).collect::<Result<Vec<_>>>()?;
        Ok(LinearTensor::Values {
            obs: obs.to_vec(),
            values,
        })
    }

    fn td_loss(
        &self,
        values: &Self::Tensor,
        act: &[usize],
        target: &[f32],
        loss: CriticLoss,
    ) -> Result<Self::Tensor> {
        let (obs, values) = match values {
            LinearTensor::Values { obs, values } => (obs, values),
            LinearTensor::Loss { .. } => bail!("td_loss expects action values"),
        };
        if act.len() != values.len() || target.len() != values.len() {
            bail!(
                "Batch of {} values, {} actions, {} targets",
                values.len(),
                act.len(),
                target.len()
            );
        }

        let n = values.len() as f32;
        let dim = self.params.w.first().map_or(0, |w| w.len());
        let mut grad = LinearParams {
            w: vec![vec![0.0; dim]; self.n_actions()],
            b: vec![0.0; self.n_actions()],
        };
        let mut value = 0f32;

        for i in 0..values.len() {
            let d = values[i][act[i]] - target[i];
            let (l, g) = match loss {
                CriticLoss::Mse => (d * d, 2.0 * d),
                CriticLoss::SmoothL1 if d.abs() < 1.0 => (0.5 * d * d, d),
                CriticLoss::SmoothL1 => (d.abs() - 0.5, d.signum()),
            };
            value += l / n;
            for (gw, x) in grad.w[act[i]].iter_mut().zip(obs[i].iter()) {
                *gw += g * x / n;
            }
            grad.b[act[i]] += g / n;
        }

        Ok(LinearTensor::Loss { value, grad })
    }

    fn update_parameters(&mut self, loss: &Self::Tensor) -> Result<f32> {
        let (value, grad) = match loss {
            LinearTensor::Loss { value, grad } => (value, grad),
            LinearTensor::Values { .. } => bail!("update_parameters expects a loss"),
        };
        for (w, gw) in self.params.w.iter_mut().zip(grad.w.iter()) {
            for (w, g) in w.iter_mut().zip(gw.iter()) {
                *w -= self.lr * g;
            }
        }
        for (b, g) in self.params.b.iter_mut().zip(grad.b.iter()) {
            *b -= self.lr * g;
        }
        Ok(*value)
    }

    fn load_parameters_from(&mut self, other: &Self) -> Result<()> {
        self.params = other.params.clone();
        Ok(())
    }

    fn soft_update_from(&mut self, other: &Self, tau: f64) -> Result<()> {
        let tau = tau as f32;
        let blend = |dest: &mut f32, src: f32| *dest = tau * src + (1.0 - tau) * *dest;
        for (w, w_src) in self.params.w.iter_mut().zip(other.params.w.iter()) {
            w.iter_mut().zip(w_src.iter()).for_each(|(d, s)| blend(d, *s));
        }
        self.params
            .b
            .iter_mut()
            .zip(other.params.b.iter())
            .for_each(|(d, s)| blend(d, *s));
        Ok(())
    }

    fn save(&self, path: &Path) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self.params)?.as_bytes())?;
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        let file = File::open(path)?;
        self.params = serde_yaml::from_reader(BufReader::new(file))?;
        Ok(())
    }
}

/// Passes observations through unchanged.
#[derive(Debug, Clone, Default)]
pub struct IdentityPreprocessor;

impl<O: Clone> Preprocessor<O> for IdentityPreprocessor {
    type Output = O;

    fn preprocess(&self, obs: &O) -> Result<O> {
        Ok(obs.clone())
    }
}

/// Configuration of [`CountingEnv`].
#[derive(Debug, Clone, PartialEq)]
pub struct CountingEnvConfig {
    /// Steps per episode; the last one is terminal.
    pub episode_len: usize,

    /// Reward of every step.
    pub reward: f32,

    /// The number of episodes, counted from the first, whose steps give zero reward.
    pub zero_reward_episodes: usize,

    /// The number of actions.
    pub n_actions: usize,

    /// Dimension of observations.
    pub dim: usize,
}

impl Default for CountingEnvConfig {
    fn default() -> Self {
        Self {
            episode_len: 5,
            reward: 1.0,
            zero_reward_episodes: 0,
            n_actions: 3,
            dim: 2,
        }
    }
}

/// An environment whose episodes last exactly `episode_len` steps whatever the
/// actions are.
///
/// Observations are `[t / episode_len; dim]` where `t` is the step count.
pub struct CountingEnv {
    config: CountingEnvConfig,
    t: usize,
    episode: usize,
}

impl CountingEnv {
    fn obs(&self) -> Vec<f32> {
        vec![self.t as f32 / self.config.episode_len as f32; self.config.dim]
    }

    /// The number of episodes started so far.
    pub fn n_episodes(&self) -> usize {
        self.episode
    }
}

impl Env for CountingEnv {
    type Config = CountingEnvConfig;
    type Obs = Vec<f32>;

    fn build(config: &Self::Config, _seed: i64) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            t: 0,
            episode: 0,
        })
    }

    fn n_actions(&self) -> usize {
        self.config.n_actions
    }

    fn reset(&mut self) -> Result<Self::Obs> {
        self.t = 0;
        self.episode += 1;
        Ok(self.obs())
    }

    fn step(&mut self, act: usize) -> Result<Step<Self>> {
        if act >= self.config.n_actions {
            bail!("Invalid action {}", act);
        }
        self.t += 1;
        let reward = if self.episode <= self.config.zero_reward_episodes {
            0.0
        } else {
            self.config.reward
        };
        let is_terminated = self.t == self.config.episode_len;
        Ok(Step::new(self.obs(), act, reward, is_terminated, false))
    }
}
