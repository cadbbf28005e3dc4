//! Action-value network trained with candle.
mod config;
use crate::{
    opt::Optimizer,
    util::{copy, smooth_l1_loss, track, trainable_vars},
    Cnn,
};
use anyhow::Result;
use candle_core::{DType, Device, ModuleT, Tensor};
use candle_nn::{loss::mse, VarBuilder, VarMap};
pub use config::QNetworkConfig;
use deepq_core::{error::DeepqError, learner::CriticLoss, Approximator, Mode};
use log::info;
use std::path::Path;

/// Convolutional action-value network together with its optimizer.
///
/// Observations are tensors of shape `(channels, height, width)`, like those
/// produced by [`FramePreprocessor`](crate::FramePreprocessor).
pub struct QNetwork {
    device: Device,
    varmap: VarMap,
    cnn: Cnn,
    opt: Optimizer,
    config: QNetworkConfig,
    mode: Mode,
}

impl QNetwork {
    /// Constructs [`QNetwork`] in [`Mode::Train`].
    pub fn build(config: QNetworkConfig, device: Device) -> Result<Self> {
        let varmap = VarMap::new();
        let cnn = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
            Cnn::build(vb, &config.cnn)?
        };
        let opt = config.opt_config.build(trainable_vars(&varmap)?)?;

        Ok(Self {
            device,
            varmap,
            cnn,
            opt,
            config,
            mode: Mode::Train,
        })
    }

    /// Returns the variables of the network, including running statistics
    /// of batch normalization.
    pub fn get_varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// The configuration of the network.
    pub fn config(&self) -> &QNetworkConfig {
        &self.config
    }

    fn forward(&self, obs: &[Tensor]) -> Result<Tensor> {
        let xs = Tensor::stack(obs, 0)?.to_device(&self.device)?;
        Ok(self.cnn.forward_t(&xs, self.mode == Mode::Train)?)
    }
}

impl Approximator for QNetwork {
    type Obs = Tensor;
    type Tensor = Tensor;

    fn n_actions(&self) -> usize {
        self.config.cnn.n_actions
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    fn predict(&self, obs: &[Tensor]) -> Result<Vec<Vec<f32>>> {
        if obs.is_empty() {
            return Ok(vec![]);
        }
        Ok(self.forward(obs)?.detach().to_vec2::<f32>()?)
    }

    fn forward_with_grad(&self, obs: &[Tensor]) -> Result<Tensor> {
        self.forward(obs)
    }

    fn td_loss(
        &self,
        values: &Tensor,
        act: &[usize],
        target: &[f32],
        loss: CriticLoss,
    ) -> Result<Tensor> {
        let batch_size = values.dims2()?.0;
        for len in [act.len(), target.len()] {
            if len != batch_size {
                return Err(DeepqError::ShapeMismatch {
                    what: "batch of the loss".to_string(),
                    expected: batch_size,
                    actual: len,
                }
                .into());
            }
        }

        let act = act.iter().map(|&a| a as u32).collect::<Vec<_>>();
        let act = Tensor::from_vec(act, (batch_size, 1), &self.device)?;
        let pred = values.gather(&act, 1)?.squeeze(1)?;
        let tgt = Tensor::from_slice(target, (batch_size,), &self.device)?;

        Ok(match loss {
            CriticLoss::Mse => mse(&pred, &tgt)?,
            CriticLoss::SmoothL1 => smooth_l1_loss(&pred, &tgt)?,
        })
    }

    fn update_parameters(&mut self, loss: &Tensor) -> Result<f32> {
        self.opt.backward_step(loss)?;
        Ok(loss.to_scalar::<f32>()?)
    }

    fn load_parameters_from(&mut self, other: &Self) -> Result<()> {
        copy(&self.varmap, &other.varmap)
    }

    fn soft_update_from(&mut self, other: &Self, tau: f64) -> Result<()> {
        track(&self.varmap, &other.varmap, tau)
    }

    fn save(&self, path: &Path) -> Result<()> {
        self.varmap.save(path)?;
        info!("Save the action-value network to {:?}", path);
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        self.varmap.load(path)?;
        info!("Load the action-value network from {:?}", path);
        Ok(())
    }
}
