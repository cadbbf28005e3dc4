//! Configuration of DQN agent.
use crate::{error::DeepqError, learner::LearnerConfig, replay_buffer::ReplayBufferConfig};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Constructs [`Dqn`](super::Dqn).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct DqnConfig {
    /// The number of transitions in a batch.
    pub batch_size: usize,

    /// Discount factor of future rewards.
    pub discount_factor: f64,

    /// The number of learning steps per observed transition once the
    /// replay buffer holds more than `batch_size` transitions.
    #[serde(default = "default_n_updates_per_opt")]
    pub n_updates_per_opt: usize,

    /// Learner.
    #[serde(default)]
    pub learner: LearnerConfig,

    /// Replay buffer.
    #[serde(default)]
    pub replay_buffer: ReplayBufferConfig,

    /// Seed of the random number generator of the explorer.
    #[serde(default)]
    pub explorer_seed: u64,
}

fn default_n_updates_per_opt() -> usize {
    1
}

impl Default for DqnConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            discount_factor: 0.99,
            n_updates_per_opt: 1,
            learner: LearnerConfig::default(),
            replay_buffer: ReplayBufferConfig::default(),
            explorer_seed: 0,
        }
    }
}

impl DqnConfig {
    /// Sets the batch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Sets the discount factor.
    pub fn discount_factor(mut self, v: f64) -> Self {
        self.discount_factor = v;
        self
    }

    /// Sets the number of learning steps per observed transition.
    pub fn n_updates_per_opt(mut self, v: usize) -> Self {
        self.n_updates_per_opt = v;
        self
    }

    /// Sets the configuration of the learner.
    pub fn learner(mut self, v: LearnerConfig) -> Self {
        self.learner = v;
        self
    }

    /// Sets the configuration of the replay buffer.
    pub fn replay_buffer(mut self, v: ReplayBufferConfig) -> Self {
        self.replay_buffer = v;
        self
    }

    /// Sets the seed of the explorer.
    pub fn explorer_seed(mut self, v: u64) -> Self {
        self.explorer_seed = v;
        self
    }

    /// Checks the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(DeepqError::InvalidBatchSize.into());
        }
        if !(0.0..=1.0).contains(&self.discount_factor) {
            return Err(DeepqError::InvalidConfig(format!(
                "discount factor must lie in [0, 1], got {}",
                self.discount_factor
            ))
            .into());
        }
        if self.replay_buffer.capacity <= self.batch_size {
            return Err(DeepqError::InvalidConfig(format!(
                "replay buffer capacity ({}) must exceed batch size ({})",
                self.replay_buffer.capacity, self.batch_size
            ))
            .into());
        }
        self.learner.validate()
    }

    /// Constructs [`DqnConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`DqnConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learner::{CriticLoss, TargetSync};
    use tempdir::TempDir;

    #[test]
    fn test_serde_dqn_config() -> Result<()> {
        let config = DqnConfig::default()
            .batch_size(32)
            .discount_factor(0.9)
            .learner(
                LearnerConfig::default()
                    .target_sync(TargetSync::Soft {
                        interval: 4,
                        tau: 0.01,
                    })
                    .critic_loss(CriticLoss::SmoothL1),
            )
            .replay_buffer(ReplayBufferConfig::default().capacity(500).seed(3));

        let dir = TempDir::new("dqn_config")?;
        let path = dir.path().join("agent.yaml");
        config.save(&path)?;
        let config_ = DqnConfig::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }

    #[test]
    fn test_minimal_yaml_uses_defaults() -> Result<()> {
        let config: DqnConfig = serde_yaml::from_str("batch_size: 16\ndiscount_factor: 0.95\n")?;
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.n_updates_per_opt, 1);
        assert_eq!(config.learner.target_sync, TargetSync::Hard { interval: 1000 });
        assert_eq!(config.replay_buffer, ReplayBufferConfig::default());
        Ok(())
    }

    #[test]
    fn test_validate() {
        assert!(DqnConfig::default().validate().is_ok());
        assert!(DqnConfig::default().batch_size(0).validate().is_err());
        assert!(DqnConfig::default().discount_factor(1.1).validate().is_err());
        let small = ReplayBufferConfig::default().capacity(64);
        assert!(DqnConfig::default().replay_buffer(small).validate().is_err());
    }
}
