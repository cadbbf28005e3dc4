#![warn(missing_docs)]
//! Core of a deep Q-learning agent.
//!
//! The crate is backend-agnostic. A value function is consumed through
//! [`Approximator`], an environment through [`Env`] and observation
//! preprocessing through [`Preprocessor`]. On top of these seams it provides
//! the replay buffer, the epsilon-greedy policy, the temporal-difference
//! learner, the [`Dqn`] agent composing them and the episode-driven
//! [`Trainer`].
pub mod dummy;
pub mod error;
pub mod explorer;
pub mod learner;
pub mod record;
pub mod replay_buffer;

mod base;
pub use base::{
    Agent, Approximator, Env, ExperienceBufferBase, Mode, Preprocessor, ReplayBufferBase, Step,
    TransitionBatch,
};

mod dqn;
pub use dqn::{Dqn, DqnConfig, CHECKPOINT_NAME};

mod trainer;
pub use trainer::{ScoreWindow, TrainOutcome, Trainer, TrainerConfig};
