//! A FIFO replay buffer with uniform sampling.
mod base;
mod config;
mod transition;
pub use base::SimpleReplayBuffer;
pub use config::ReplayBufferConfig;
pub use transition::Transition;
