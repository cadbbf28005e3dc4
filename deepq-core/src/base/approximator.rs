//! Action-value function approximator.
use crate::learner::CriticLoss;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Behavior of layers that act differently in training and inference, like
/// batch normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Mode {
    /// Layers use batch statistics and update their running estimates.
    Train,

    /// Layers use their running estimates.
    Inference,
}

/// A function mapping an observation to a vector of action values.
///
/// The DQN agent holds two instances of the same approximator, the local one,
/// updated at every learning step, and the target one, used to compute
/// bootstrapped targets and refreshed from the local one on a configurable
/// cadence.
pub trait Approximator {
    /// A single preprocessed observation.
    type Obs: Clone;

    /// Differentiable output of [`Approximator::forward_with_grad`] and
    /// [`Approximator::td_loss`].
    type Tensor;

    /// The number of actions, i.e., the length of the action-value vector.
    fn n_actions(&self) -> usize;

    /// Returns the current mode.
    fn mode(&self) -> Mode;

    /// Switches between training and inference behavior.
    fn set_mode(&mut self, mode: Mode);

    /// Computes action values of a batch of observations without tracking
    /// gradients.
    ///
    /// The returned vector has one row of length [`Approximator::n_actions`]
    /// per observation.
    fn predict(&self, obs: &[Self::Obs]) -> Result<Vec<Vec<f32>>>;

    /// Computes action values of a batch of observations with gradient tracking.
    fn forward_with_grad(&self, obs: &[Self::Obs]) -> Result<Self::Tensor>;

    /// Computes the loss between the values of the taken actions, gathered
    /// from `values`, and the constant targets.
    fn td_loss(
        &self,
        values: &Self::Tensor,
        act: &[usize],
        target: &[f32],
        loss: CriticLoss,
    ) -> Result<Self::Tensor>;

    /// Applies one optimizer step reducing `loss` and returns the loss value.
    fn update_parameters(&mut self, loss: &Self::Tensor) -> Result<f32>;

    /// Overwrites all parameters with those of `other`.
    fn load_parameters_from(&mut self, other: &Self) -> Result<()>;

    /// Blends parameters towards `other`: `self = tau * other + (1 - tau) * self`.
    fn soft_update_from(&mut self, other: &Self, tau: f64) -> Result<()>;

    /// Saves the parameters in a file.
    fn save(&self, path: &Path) -> Result<()>;

    /// Loads the parameters from a file.
    fn load(&mut self, path: &Path) -> Result<()>;
}
