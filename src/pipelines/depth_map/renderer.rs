// SPDX-License-Identifier: GPL-3.0-only

//! Offscreen depth renderer interface and backend selection

use super::software::CpuDepthRenderer;
use crate::calibration::CameraTransform;
use crate::config::RenderBackend;
use crate::errors::RenderError;
use crate::point_cloud::Point;
use crate::shaders::GpuDepthRenderer;
use tracing::{info, warn};

/// Float RGBA image read back from a render target
///
/// Rows are stored bottom-up: row 0 is the bottom of the image, matching the
/// graphics-API readback convention. The red channel holds camera-space depth
/// and is 0 wherever no point was drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthReadback {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<f32>,
}

impl DepthReadback {
    /// An all-zero readback
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rgba: vec![0.0; (width * height * 4) as usize],
        }
    }

    /// Red channel of the pixel at column `x`, bottom-up row `y`
    pub fn depth_at(&self, x: u32, y: u32) -> f32 {
        self.rgba[((y * self.width + x) * 4) as usize]
    }

    /// Red channel of every pixel, bottom-up row order
    pub fn red_channel(&self) -> impl Iterator<Item = f32> + '_ {
        self.rgba.chunks_exact(4).map(|px| px[0])
    }
}

/// Renders a point cloud as seen from a calibrated camera
///
/// Implementations own their render target for their whole lifetime and
/// clear it at the start of every call, so one renderer serves a whole batch.
pub trait DepthRenderer {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Render target size in pixels
    fn size(&self) -> (u32, u32);

    /// Draw `points` and read the result back
    ///
    /// With `patch_size > 0` every point becomes a camera-facing square of
    /// that side length; otherwise each point covers a single pixel. Nearer
    /// fragments win.
    fn render_depth(
        &mut self,
        points: &[Point],
        transform: &CameraTransform,
        patch_size: f32,
    ) -> Result<DepthReadback, RenderError>;
}

/// Create the renderer for `backend`
///
/// `Auto` tries the GPU first and falls back to the software rasterizer.
pub fn create_renderer(
    backend: RenderBackend,
    width: u32,
    height: u32,
) -> Result<Box<dyn DepthRenderer>, RenderError> {
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidSize { width, height });
    }

    let renderer: Box<dyn DepthRenderer> = match backend {
        RenderBackend::Gpu => Box::new(pollster::block_on(GpuDepthRenderer::new(width, height))?),
        RenderBackend::Cpu => Box::new(CpuDepthRenderer::new(width, height)?),
        RenderBackend::Auto => match pollster::block_on(GpuDepthRenderer::new(width, height)) {
            Ok(renderer) => Box::new(renderer),
            Err(e) => {
                warn!(error = %e, "GPU renderer unavailable, using software rasterizer");
                Box::new(CpuDepthRenderer::new(width, height)?)
            }
        },
    };

    info!(backend = renderer.name(), width, height, "Depth renderer ready");
    Ok(renderer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readback_red_channel() {
        let readback = DepthReadback {
            width: 2,
            height: 1,
            rgba: vec![1.5, 0.0, 0.0, 1.0, 2.5, 9.0, 9.0, 1.0],
        };
        assert_eq!(readback.red_channel().collect::<Vec<_>>(), vec![1.5, 2.5]);
        assert_eq!(readback.depth_at(1, 0), 2.5);
    }

    #[test]
    fn test_zero_size_rejected() {
        let err = create_renderer(RenderBackend::Cpu, 0, 216).err().unwrap();
        assert!(matches!(
            err,
            RenderError::InvalidSize {
                width: 0,
                height: 216
            }
        ));
    }

    #[test]
    fn test_cpu_backend_selected() {
        let renderer = create_renderer(RenderBackend::Cpu, 8, 4).unwrap();
        assert_eq!(renderer.name(), "cpu");
        assert_eq!(renderer.size(), (8, 4));
    }
}
