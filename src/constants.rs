// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants
//!
//! Defaults for the rig geometry, projection and depth encoding. Every value
//! here can be overridden through [`crate::config::DepthMapConfig`].

/// Native sensor width of the rig cameras (pixels)
pub const BASE_WIDTH: u32 = 1920;
/// Native sensor height of the rig cameras (pixels)
pub const BASE_HEIGHT: u32 = 1080;

/// Scale applied to the sensor size and to fx, fy, cx, cy
pub const DISPLAY_SCALE: f32 = 0.2;

/// Near clipping plane (point cloud units)
pub const NEAR_PLANE: f32 = 0.1;
/// Far clipping plane (point cloud units)
pub const FAR_PLANE: f32 = 1000.0;

/// Side length of the camera-facing square each point is expanded into
pub const PATCH_SIZE: f32 = 0.8;

/// Fixed-point factor between scene depth and 16-bit pixel values
pub const DEPTH_SCALE: f32 = 10000.0;

/// Points at or above this height are cropped away
pub const FILTER_MAX_HEIGHT: f32 = -5.0;
/// Points with x² + z² at or beyond this are cropped away
pub const FILTER_MAX_RADIUS_SQ: f32 = 45000.0;

/// Output resolution for a base size and display scale.
///
/// Truncates like the rig's capture tooling does, so 1920x1080 at 0.2
/// yields 384x216.
pub fn scaled_resolution(base_width: u32, base_height: u32, scale: f32) -> (u32, u32) {
    (
        (base_width as f32 * scale) as u32,
        (base_height as f32 * scale) as u32,
    )
}

/// Application information utilities
pub mod app_info {
    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_resolution() {
        assert_eq!(
            scaled_resolution(BASE_WIDTH, BASE_HEIGHT, DISPLAY_SCALE),
            (384, 216)
        );
    }

    #[test]
    fn test_full_resolution() {
        assert_eq!(scaled_resolution(1920, 1080, 1.0), (1920, 1080));
    }
}
