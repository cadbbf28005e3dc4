//! Configuration of [`Trainer`](super::Trainer).
use crate::{error::DeepqError, explorer::EpsilonDecay};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Trainer`](super::Trainer).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TrainerConfig {
    /// The maximum number of episodes.
    pub max_episodes: usize,

    /// The maximum number of environment steps in an episode.
    pub max_steps_per_episode: usize,

    /// Exploration schedule.
    #[serde(default)]
    pub epsilon: EpsilonDecay,

    /// Training stops once the mean score of the window reaches this value.
    /// `None` runs all `max_episodes` episodes.
    pub solved_threshold: Option<f32>,

    /// The number of most recent episodes averaged in the score window.
    pub score_window: usize,

    /// Interval of progress reports in episodes.
    pub report_interval: usize,

    /// Where to save the model when the task is solved.
    pub model_dir: Option<String>,

    /// Random seed of the environment.
    #[serde(default)]
    pub env_seed: i64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            max_episodes: 2000,
            max_steps_per_episode: 10000,
            epsilon: EpsilonDecay::default(),
            solved_threshold: Some(500.0),
            score_window: 100,
            report_interval: 100,
            model_dir: None,
            env_seed: 0,
        }
    }
}

impl TrainerConfig {
    /// Sets the maximum number of episodes.
    pub fn max_episodes(mut self, v: usize) -> Self {
        self.max_episodes = v;
        self
    }

    /// Sets the maximum number of steps in an episode.
    pub fn max_steps_per_episode(mut self, v: usize) -> Self {
        self.max_steps_per_episode = v;
        self
    }

    /// Sets the exploration schedule.
    pub fn epsilon(mut self, v: EpsilonDecay) -> Self {
        self.epsilon = v;
        self
    }

    /// Sets the score at which the task is regarded as solved.
    pub fn solved_threshold(mut self, v: Option<f32>) -> Self {
        self.solved_threshold = v;
        self
    }

    /// Sets the capacity of the score window.
    pub fn score_window(mut self, v: usize) -> Self {
        self.score_window = v;
        self
    }

    /// Sets the interval of progress reports.
    pub fn report_interval(mut self, v: usize) -> Self {
        self.report_interval = v;
        self
    }

    /// Sets the directory where the model is saved.
    pub fn model_dir(mut self, v: impl Into<String>) -> Self {
        self.model_dir = Some(v.into());
        self
    }

    /// Sets the random seed of the environment.
    pub fn env_seed(mut self, v: i64) -> Self {
        self.env_seed = v;
        self
    }

    /// Checks the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.score_window == 0 {
            return Err(
                DeepqError::InvalidConfig("score window must be positive".to_string()).into(),
            );
        }
        if self.report_interval == 0 {
            return Err(
                DeepqError::InvalidConfig("report interval must be positive".to_string()).into(),
            );
        }
        if self.max_steps_per_episode == 0 {
            return Err(DeepqError::InvalidConfig(
                "max_steps_per_episode must be positive".to_string(),
            )
            .into());
        }
        self.epsilon.validate()
    }

    /// Constructs [`TrainerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`TrainerConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
