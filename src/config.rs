// SPDX-License-Identifier: GPL-3.0-only

use crate::constants;
use crate::errors::ConfigError;
use crate::point_cloud::PointFilter;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which renderer draws the depth maps
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RenderBackend {
    /// Use the GPU when an adapter is available, otherwise the CPU
    #[default]
    Auto,
    /// Always render on the GPU, failing if none is available
    Gpu,
    /// Always render with the software rasterizer
    Cpu,
}

/// Render and encoding settings for a batch run
///
/// Every field has a default, so a config file only needs to list the
/// values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthMapConfig {
    /// Native camera width before scaling
    pub base_width: u32,
    /// Native camera height before scaling
    pub base_height: u32,
    /// Scale for the output size and the pinhole parameters
    pub display_scale: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
    /// Patch side length used when densifying
    pub patch_size: f32,
    /// Expand points into patches (false renders single pixels)
    pub densify: bool,
    /// Scene depth to 16-bit pixel factor
    pub depth_scale: f32,
    /// Spatial crop applied while loading clouds
    pub filter: PointFilter,
    /// Renderer selection
    pub backend: RenderBackend,
}

impl Default for DepthMapConfig {
    fn default() -> Self {
        Self {
            base_width: constants::BASE_WIDTH,
            base_height: constants::BASE_HEIGHT,
            display_scale: constants::DISPLAY_SCALE,
            near: constants::NEAR_PLANE,
            far: constants::FAR_PLANE,
            patch_size: constants::PATCH_SIZE,
            densify: true,
            depth_scale: constants::DEPTH_SCALE,
            filter: PointFilter::default(),
            backend: RenderBackend::default(),
        }
    }
}

impl DepthMapConfig {
    /// Load a config from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Output image size in pixels
    pub fn resolution(&self) -> (u32, u32) {
        constants::scaled_resolution(self.base_width, self.base_height, self.display_scale)
    }

    /// Patch size handed to the renderer; zero means one pixel per point
    pub fn effective_patch_size(&self) -> f32 {
        if self.densify { self.patch_size } else { 0.0 }
    }

    /// Reject settings that would produce an empty image or a degenerate projection
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.display_scale > 0.0) {
            return Err(ConfigError::Invalid {
                field: "display_scale",
                reason: format!("must be positive, got {}", self.display_scale),
            });
        }
        let (width, height) = self.resolution();
        if width == 0 || height == 0 {
            return Err(ConfigError::Invalid {
                field: "base_width/base_height",
                reason: format!("scaled resolution {}x{} is empty", width, height),
            });
        }
        if !(self.near > 0.0) {
            return Err(ConfigError::Invalid {
                field: "near",
                reason: format!("must be positive, got {}", self.near),
            });
        }
        if !(self.far > self.near) {
            return Err(ConfigError::Invalid {
                field: "far",
                reason: format!("must exceed near ({}), got {}", self.near, self.far),
            });
        }
        if !(self.depth_scale > 0.0) {
            return Err(ConfigError::Invalid {
                field: "depth_scale",
                reason: format!("must be positive, got {}", self.depth_scale),
            });
        }
        if self.patch_size.is_nan() {
            return Err(ConfigError::Invalid {
                field: "patch_size",
                reason: "must be a number".to_string(),
            });
        }
        Ok(())
    }
}
