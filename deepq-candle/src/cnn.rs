//! Convolutional action-value network.
use anyhow::{bail, Result};
use candle_core::{ModuleT, Tensor};
use candle_nn::{
    batch_norm, conv::Conv2dConfig, conv2d, linear, BatchNorm, BatchNormConfig, Conv2d, Linear,
    VarBuilder,
};
use serde::{Deserialize, Serialize};

/// `(out_channels, kernel, stride)` of the convolutional layers.
const CONV_LAYERS: [(usize, usize, usize); 4] = [(32, 8, 4), (64, 4, 2), (64, 3, 1), (128, 3, 1)];

/// Configuration of [`Cnn`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone)]
pub struct CnnConfig {
    /// The number of actions.
    pub n_actions: usize,

    /// Channels of input frames.
    #[serde(default = "default_in_channels")]
    pub in_channels: usize,

    /// Height of input frames.
    #[serde(default = "default_frame_size")]
    pub height: usize,

    /// Width of input frames.
    #[serde(default = "default_frame_size")]
    pub width: usize,
}

fn default_in_channels() -> usize {
    3
}

fn default_frame_size() -> usize {
    128
}

impl CnnConfig {
    /// Configuration for RGB frames of 128x128 pixels.
    pub fn new(n_actions: usize) -> Self {
        Self {
            n_actions,
            in_channels: default_in_channels(),
            height: default_frame_size(),
            width: default_frame_size(),
        }
    }

    /// Sets the size of input frames.
    pub fn frame_size(mut self, height: usize, width: usize) -> Self {
        self.height = height;
        self.width = width;
        self
    }

    /// Sets the number of input channels.
    pub fn in_channels(mut self, v: usize) -> Self {
        self.in_channels = v;
        self
    }

    /// Returns the number of features fed to the first dense layer.
    ///
    /// With 128x128 frames the last feature map is 10x10, giving 12800 features.
    pub fn flat_dim(&self) -> Result<usize> {
        let mut h = self.height;
        let mut w = self.width;
        for (_, kernel, stride) in CONV_LAYERS {
            if h < kernel || w < kernel {
                bail!(
                    "Frames of {}x{} pixels are too small for the convolutional layers",
                    self.height,
                    self.width
                );
            }
            h = (h - kernel) / stride + 1;
            w = (w - kernel) / stride + 1;
        }
        Ok(CONV_LAYERS[3].0 * h * w)
    }
}

/// Four convolutional layers with batch normalization followed by three dense
/// layers.
///
/// Input is a batch of frames of shape `(batch, in_channels, height, width)`
/// with values in `[0, 1]`. Output has shape `(batch, n_actions)`.
pub struct Cnn {
    convs: Vec<(Conv2d, BatchNorm)>,
    fc1: Linear,
    fc2: Linear,
    fc3: Linear,
}

impl Cnn {
    /// Builds the network, registering its variables through `vb`.
    pub fn build(vb: VarBuilder, config: &CnnConfig) -> Result<Self> {
        let flat_dim = config.flat_dim()?;
        let mut in_channels = config.in_channels;
        let mut convs = Vec::with_capacity(CONV_LAYERS.len());

        for (i, (out_channels, kernel, stride)) in CONV_LAYERS.into_iter().enumerate() {
            let conv_config = Conv2dConfig {
                stride,
                ..Default::default()
            };
            let vb_conv = vb.pp(format!("c{}", i + 1));
            let conv = conv2d(in_channels, out_channels, kernel, conv_config, vb_conv)?;
            let vb_bn = vb.pp(format!("bn{}", i + 1));
            let bn = batch_norm(out_channels, BatchNormConfig::default(), vb_bn)?;
            convs.push((conv, bn));
            in_channels = out_channels;
        }

        Ok(Self {
            convs,
            fc1: linear(flat_dim, 512, vb.pp("fc1"))?,
            fc2: linear(512, 256, vb.pp("fc2"))?,
            fc3: linear(256, config.n_actions, vb.pp("fc3"))?,
        })
    }
}

impl ModuleT for Cnn {
    /// Batch normalization uses batch statistics if `train` is `true` and the
    /// running estimates otherwise.
    fn forward_t(&self, xs: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        let mut xs = xs.clone();
        for (conv, bn) in self.convs.iter() {
            xs = xs.apply(conv)?.apply_t(bn, train)?.relu()?;
        }
        xs.flatten_from(1)?
            .apply(&self.fc1)?
            .relu()?
            .apply(&self.fc2)?
            .relu()?
            .apply(&self.fc3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn test_flat_dim() -> Result<()> {
        assert_eq!(CnnConfig::new(9).flat_dim()?, 12800);
        assert_eq!(CnnConfig::new(9).frame_size(52, 52).flat_dim()?, 128);
        assert!(CnnConfig::new(9).frame_size(40, 40).flat_dim().is_err());
        Ok(())
    }

    #[test]
    fn test_output_shape() -> Result<()> {
        let config = CnnConfig::new(5).frame_size(52, 52);
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let cnn = Cnn::build(vb, &config)?;

        let xs = Tensor::rand(0f32, 1f32, (2, 3, 52, 52), &Device::Cpu)?;
        assert_eq!(cnn.forward_t(&xs, true)?.dims(), &[2, 5]);
        assert_eq!(cnn.forward_t(&xs, false)?.dims(), &[2, 5]);

        // Running statistics of batch normalization live in the variable map.
        let data = varmap.data().lock().unwrap();
        assert!(data.contains_key("bn1.running_mean"));
        assert!(data.contains_key("bn4.running_var"));
        Ok(())
    }
}
