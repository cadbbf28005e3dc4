//! Configuration of [`Learner`](super::Learner).
use crate::error::DeepqError;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Critic loss type.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
pub enum CriticLoss {
    /// Mean squared error.
    Mse,

    /// Smooth L1 loss.
    SmoothL1,
}

/// How the target approximator follows the local one.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub enum TargetSync {
    /// Overwrite the target parameters with the local ones every `interval`
    /// learning steps.
    Hard {
        /// Interval in learning steps.
        interval: usize,
    },

    /// Blend the target parameters towards the local ones every `interval`
    /// learning steps: `target = tau * local + (1 - tau) * target`.
    Soft {
        /// Interval in learning steps.
        interval: usize,

        /// Blending coefficient in `(0, 1]`.
        tau: f64,
    },

    /// Keep the target approximator as initialized.
    Never,
}

impl Default for TargetSync {
    fn default() -> Self {
        Self::Hard { interval: 1000 }
    }
}

impl TargetSync {
    /// Returns `true` if a synchronization happens after the `n_updates`-th
    /// learning step.
    pub fn is_due(&self, n_updates: usize) -> bool {
        match self {
            Self::Hard { interval } | Self::Soft { interval, .. } => {
                *interval > 0 && n_updates % interval == 0
            }
            Self::Never => false,
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Self::Hard { interval } | Self::Soft { interval, .. } if *interval == 0 => {
                Err(DeepqError::InvalidConfig("sync interval must be positive".to_string()).into())
            }
            Self::Soft { tau, .. } if !(*tau > 0.0 && *tau <= 1.0) => Err(DeepqError::InvalidConfig(
                format!("tau must lie in (0, 1], got {}", tau),
            )
            .into()),
            _ => Ok(()),
        }
    }
}

/// Configuration of [`Learner`](super::Learner).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct LearnerConfig {
    /// Synchronization of the target approximator.
    #[serde(default)]
    pub target_sync: TargetSync,

    /// If `true`, the action of the bootstrapped value is selected with the
    /// local approximator and evaluated with the target one.
    #[serde(default)]
    pub double_dqn: bool,

    /// Loss between predicted values and targets.
    pub critic_loss: CriticLoss,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            target_sync: TargetSync::default(),
            double_dqn: false,
            critic_loss: CriticLoss::Mse,
        }
    }
}

impl LearnerConfig {
    /// Sets the target synchronization.
    pub fn target_sync(mut self, v: TargetSync) -> Self {
        self.target_sync = v;
        self
    }

    /// Enables or disables double DQN.
    pub fn double_dqn(mut self, v: bool) -> Self {
        self.double_dqn = v;
        self
    }

    /// Sets the critic loss.
    pub fn critic_loss(mut self, v: CriticLoss) -> Self {
        self.critic_loss = v;
        self
    }

    /// Checks the configuration.
    pub fn validate(&self) -> Result<()> {
        self.target_sync.validate()
    }
}
