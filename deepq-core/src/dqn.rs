//! DQN agent.
mod base;
mod config;
pub use base::{Dqn, CHECKPOINT_NAME};
pub use config::DqnConfig;
