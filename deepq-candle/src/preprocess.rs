//! Preprocessing of RGB frames.
use anyhow::{anyhow, Result};
use candle_core::{DType, Device, Tensor};
use deepq_core::{error::DeepqError, Preprocessor};
use image::{
    imageops::{resize, FilterType::Triangle},
    ImageBuffer, Rgb,
};

/// An RGB frame with interleaved channels, row by row.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbFrame {
    /// Width in pixels.
    pub width: u32,

    /// Height in pixels.
    pub height: u32,

    /// Pixel values, `3 * width * height` bytes.
    pub data: Vec<u8>,
}

impl RgbFrame {
    /// Constructs a frame, checking the length of `data`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = 3 * width as usize * height as usize;
        if data.len() != expected {
            return Err(DeepqError::ShapeMismatch {
                what: "RGB frame".to_string(),
                expected,
                actual: data.len(),
            }
            .into());
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }
}

/// Resizes frames with bilinear filtering and converts them to tensors of
/// shape `(3, height, width)` with values in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct FramePreprocessor {
    width: u32,
    height: u32,
    device: Device,
}

impl FramePreprocessor {
    /// Resizes frames to `width` x `height`.
    pub fn new(width: u32, height: u32, device: Device) -> Self {
        Self {
            width,
            height,
            device,
        }
    }
}

impl Default for FramePreprocessor {
    /// 128x128 frames on CPU.
    fn default() -> Self {
        Self::new(128, 128, Device::Cpu)
    }
}

impl Preprocessor<RgbFrame> for FramePreprocessor {
    type Output = Tensor;

    fn preprocess(&self, frame: &RgbFrame) -> Result<Tensor> {
        let (width, height) = (frame.width, frame.height);
        let img = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, frame.data.as_slice())
            .ok_or_else(|| {
                anyhow!(
                    "{} bytes do not make a {}x{} RGB frame",
                    frame.data.len(),
                    width,
                    height
                )
            })?;
        let img = resize(&img, self.width, self.height, Triangle);
        let shape = (self.height as usize, self.width as usize, 3);
        let xs = Tensor::from_vec(img.into_raw(), shape, &self.device)?
            .permute((2, 0, 1))?
            .to_dtype(DType::F32)?;
        Ok((xs / 255.0)?.contiguous()?)
    }
}
