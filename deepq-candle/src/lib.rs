//! Convolutional action-value network for [`deepq_core`] implemented with
//! [candle](https://crates.io/crates/candle-core).
//!
//! [`QNetwork`] implements [`deepq_core::Approximator`] on top of [`Cnn`], and
//! [`FramePreprocessor`] turns RGB frames into the tensors it consumes.
mod cnn;
mod model;
pub mod opt;
mod preprocess;
pub mod util;
pub use cnn::{Cnn, CnnConfig};
pub use model::{QNetwork, QNetworkConfig};
pub use preprocess::{FramePreprocessor, RgbFrame};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Copy, Default, Deserialize, Serialize, PartialEq)]
/// Device for using candle.
///
/// This enum is added because [`candle_core::Device`] does not support serialization.
pub enum Device {
    /// The main CPU device.
    #[default]
    Cpu,

    /// The GPU device with the given ordinal.
    Cuda(usize),
}

impl TryFrom<Device> for candle_core::Device {
    type Error = candle_core::Error;

    fn try_from(device: Device) -> Result<Self, Self::Error> {
        match device {
            Device::Cpu => Ok(candle_core::Device::Cpu),
            Device::Cuda(n) => candle_core::Device::new_cuda(n),
        }
    }
}
