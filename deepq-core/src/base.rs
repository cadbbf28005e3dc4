//! Core functionalities.
mod agent;
mod approximator;
mod batch;
mod env;
mod preprocess;
mod replay_buffer;
mod step;
pub use agent::Agent;
pub use approximator::{Approximator, Mode};
pub use batch::TransitionBatch;
pub use env::Env;
pub use preprocess::Preprocessor;
pub use replay_buffer::{ExperienceBufferBase, ReplayBufferBase};
pub use step::Step;
