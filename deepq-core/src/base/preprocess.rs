//! Observation preprocessing.
use anyhow::Result;

/// Converts a raw observation of an environment into the fixed-shape input of
/// an [`Approximator`](crate::Approximator).
///
/// Implementations must be pure: the same observation always yields the same
/// output.
pub trait Preprocessor<O> {
    /// Preprocessed observation.
    type Output: Clone;

    /// Preprocesses an observation.
    fn preprocess(&self, obs: &O) -> Result<Self::Output>;
}
