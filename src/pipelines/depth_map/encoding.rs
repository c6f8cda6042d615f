// SPDX-License-Identifier: GPL-3.0-only

//! 16-bit depth image encoding
//!
//! Depth is stored as fixed point: pixel = round(depth × scale), saturated to
//! the u16 range. With the default scale of 10000 one pixel step is 0.1 mm
//! for clouds in centimetres, and the largest representable depth is 6.5535.

use super::renderer::DepthReadback;
use crate::errors::EncodeError;
use image::{ImageBuffer, ImageFormat, Luma, imageops};
use std::path::Path;
use tracing::debug;

/// Single-channel 16-bit depth image, top row first
pub type DepthImage = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Scale a scene depth into a pixel value
///
/// Negative and NaN depths become 0, values past the range become 65535.
pub fn depth_to_pixel(depth: f32, depth_scale: f32) -> u16 {
    let scaled = (depth as f64 * depth_scale as f64).round();
    if scaled.is_nan() {
        return 0;
    }
    scaled.clamp(0.0, u16::MAX as f64) as u16
}

/// Converts readbacks into 16-bit PNG depth images
#[derive(Debug, Clone, Copy)]
pub struct DepthImageEncoder {
    depth_scale: f32,
}

impl DepthImageEncoder {
    pub fn new(depth_scale: f32) -> Self {
        Self { depth_scale }
    }

    pub fn depth_scale(&self) -> f32 {
        self.depth_scale
    }

    /// Red channel of `readback`, scaled and flipped so row 0 is the top
    pub fn encode(&self, readback: &DepthReadback) -> Result<DepthImage, EncodeError> {
        let expected = (readback.width * readback.height * 4) as usize;
        if readback.rgba.len() != expected {
            return Err(EncodeError::SizeMismatch {
                actual: readback.rgba.len(),
                expected,
            });
        }

        let pixels: Vec<u16> = readback
            .red_channel()
            .map(|d| depth_to_pixel(d, self.depth_scale))
            .collect();

        let mut image = DepthImage::from_raw(readback.width, readback.height, pixels).ok_or(
            EncodeError::SizeMismatch {
                actual: readback.rgba.len(),
                expected,
            },
        )?;
        imageops::flip_vertical_in_place(&mut image);

        Ok(image)
    }

    /// Save as a lossless 16-bit grayscale PNG, creating parent directories
    pub fn write(&self, image: &DepthImage, path: &Path) -> Result<(), EncodeError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| EncodeError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        image
            .save_with_format(path, ImageFormat::Png)
            .map_err(|source| EncodeError::Save {
                path: path.to_path_buf(),
                source,
            })?;

        debug!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            "Depth image written"
        );
        Ok(())
    }

    /// Encode and write in one step
    pub fn encode_to_file(&self, readback: &DepthReadback, path: &Path) -> Result<(), EncodeError> {
        let image = self.encode(readback)?;
        self.write(&image, path)
    }
}

impl Default for DepthImageEncoder {
    fn default() -> Self {
        Self::new(crate::constants::DEPTH_SCALE)
    }
}
