// SPDX-License-Identifier: GPL-3.0-only

//! Software depth splat rasterizer
//!
//! Produces the same readback as the GPU renderer without a graphics
//! device. Clip-space handling follows OpenGL rules: points with w <= 0 or
//! NDC depth outside [-1, 1] are dropped, window depth is `(z + 1) / 2`
//! tested with "less" against a buffer cleared to 1.0, and a pixel is
//! covered when its centre lies inside the patch.

use super::renderer::{DepthReadback, DepthRenderer};
use crate::calibration::CameraTransform;
use crate::errors::RenderError;
use crate::point_cloud::Point;
use glam::{Vec3, Vec4};
use std::ops::Range;
use tracing::debug;

/// CPU implementation of [`DepthRenderer`]
pub struct CpuDepthRenderer {
    width: u32,
    height: u32,
    /// Window-space depth per pixel, bottom-up rows
    zbuffer: Vec<f32>,
    /// RGBA32F color target, bottom-up rows
    color: Vec<f32>,
}

impl CpuDepthRenderer {
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidSize { width, height });
        }
        let pixels = (width * height) as usize;
        Ok(Self {
            width,
            height,
            zbuffer: vec![1.0; pixels],
            color: vec![0.0; pixels * 4],
        })
    }

    fn clear(&mut self) {
        self.zbuffer.fill(1.0);
        self.color.fill(0.0);
    }

    /// NDC to window coordinates, origin at the bottom-left corner
    fn to_window(&self, ndc: Vec3) -> Vec3 {
        Vec3::new(
            (ndc.x + 1.0) * 0.5 * self.width as f32,
            (ndc.y + 1.0) * 0.5 * self.height as f32,
            (ndc.z + 1.0) * 0.5,
        )
    }

    fn write(&mut self, x: u32, y: u32, window_depth: f32, depth: f32) {
        let index = (y * self.width + x) as usize;
        if window_depth < self.zbuffer[index] {
            self.zbuffer[index] = window_depth;
            self.color[index * 4..index * 4 + 4].copy_from_slice(&[depth, depth, depth, 1.0]);
        }
    }

    fn splat_patch(&mut self, point: Point, transform: &CameraTransform, half: f32) {
        let world = Vec3::from(point).extend(1.0);
        let center = transform.mvp * world;
        let Some(ndc_z) = clip_depth(center) else {
            return;
        };
        let depth = transform.to_camera(Vec3::from(point)).z;

        // Offsets stay in the image plane, so the patch is an axis-aligned
        // rectangle sharing the centre's w
        let low = center + transform.projection * Vec4::new(-half, -half, 0.0, 0.0);
        let high = center + transform.projection * Vec4::new(half, half, 0.0, 0.0);
        let a = self.to_window((low / low.w).truncate());
        let b = self.to_window((high / high.w).truncate());
        let window_depth = (ndc_z + 1.0) * 0.5;

        for y in covered(a.y.min(b.y), a.y.max(b.y), self.height) {
            for x in covered(a.x.min(b.x), a.x.max(b.x), self.width) {
                self.write(x, y, window_depth, depth);
            }
        }
    }

    fn splat_pixel(&mut self, point: Point, transform: &CameraTransform) {
        let world = Vec3::from(point).extend(1.0);
        let clip = transform.mvp * world;
        if clip_depth(clip).is_none() {
            return;
        }
        let window = self.to_window((clip / clip.w).truncate());
        if !(window.x >= 0.0 && window.y >= 0.0) {
            return;
        }
        let (x, y) = (window.x as u32, window.y as u32);
        if x < self.width && y < self.height {
            let depth = transform.to_camera(Vec3::from(point)).z;
            self.write(x, y, window.z, depth);
        }
    }
}

/// NDC depth of a clip-space position, or None when it is clipped
fn clip_depth(clip: Vec4) -> Option<f32> {
    if !(clip.w > 0.0) {
        return None;
    }
    let z = clip.z / clip.w;
    (-1.0..=1.0).contains(&z).then_some(z)
}

/// Pixel indices whose centres fall in `[lo, hi)`, clamped to `0..size`
fn covered(lo: f32, hi: f32, size: u32) -> Range<u32> {
    if !(lo < hi) {
        return 0..0;
    }
    let start = (lo - 0.5).ceil().max(0.0);
    let end = (hi - 0.5).ceil().min(size as f32);
    if start < end {
        start as u32..end as u32
    } else {
        0..0
    }
}

impl DepthRenderer for CpuDepthRenderer {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn render_depth(
        &mut self,
        points: &[Point],
        transform: &CameraTransform,
        patch_size: f32,
    ) -> Result<DepthReadback, RenderError> {
        self.clear();

        if patch_size > 0.0 {
            let half = patch_size * 0.5;
            for &point in points {
                self.splat_patch(point, transform, half);
            }
        } else {
            for &point in points {
                self.splat_pixel(point, transform);
            }
        }

        debug!(points = points.len(), patch_size, "Software depth splat rendered");

        Ok(DepthReadback {
            width: self.width,
            height: self.height,
            rgba: self.color.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{CameraCalibration, CameraId, ProjectionParams};

    const WIDTH: u32 = 64;
    const HEIGHT: u32 = 32;

    fn transform() -> CameraTransform {
        let camera = CameraCalibration {
            id: CameraId::new(0, 0),
            k: [[100.0, 0.0, 32.0], [0.0, 100.0, 16.0], [0.0, 0.0, 1.0]],
            r: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            t: [0.0, 0.0, 0.0],
        };
        let params = ProjectionParams {
            width: WIDTH,
            height: HEIGHT,
            near: 0.1,
            far: 1000.0,
            display_scale: 1.0,
        };
        CameraTransform::from_calibration(&camera, &params)
    }

    fn covered_pixels(readback: &DepthReadback) -> usize {
        readback.red_channel().filter(|&d| d != 0.0).count()
    }

    #[test]
    fn test_patch_footprint() {
        let mut renderer = CpuDepthRenderer::new(WIDTH, HEIGHT).unwrap();
        let readback = renderer
            .render_depth(&[[0.0, 0.0, 5.0]], &transform(), 0.5)
            .unwrap();

        // 0.5 units at depth 5 with fx = fy = 100 spans 10 pixels each way
        assert_eq!(covered_pixels(&readback), 100);
        assert_eq!(readback.depth_at(32, 16), 5.0);
        assert_eq!(readback.depth_at(27, 11), 5.0);
        assert_eq!(readback.depth_at(36, 20), 5.0);
        assert_eq!(readback.depth_at(37, 16), 0.0);
        assert_eq!(readback.depth_at(26, 16), 0.0);
    }

    #[test]
    fn test_nearer_point_wins() {
        let mut renderer = CpuDepthRenderer::new(WIDTH, HEIGHT).unwrap();
        let transform = transform();

        let far_first = renderer
            .render_depth(&[[0.0, 0.0, 10.0], [0.0, 0.0, 5.0]], &transform, 0.5)
            .unwrap();
        let near_first = renderer
            .render_depth(&[[0.0, 0.0, 5.0], [0.0, 0.0, 10.0]], &transform, 0.5)
            .unwrap();

        assert_eq!(far_first.depth_at(32, 16), 5.0);
        assert_eq!(near_first, far_first);
    }

    #[test]
    fn test_single_pixel_mode() {
        let mut renderer = CpuDepthRenderer::new(WIDTH, HEIGHT).unwrap();

        // u = 34.5, v = 18.5, so window row 32 - 18.5 = 13.5
        let readback = renderer
            .render_depth(&[[0.125, 0.125, 5.0]], &transform(), 0.0)
            .unwrap();

        assert_eq!(covered_pixels(&readback), 1);
        assert_eq!(readback.depth_at(34, 13), 5.0);
    }

    #[test]
    fn test_clipped_points_are_dropped() {
        let mut renderer = CpuDepthRenderer::new(WIDTH, HEIGHT).unwrap();
        let readback = renderer
            .render_depth(
                &[[0.0, 0.0, -5.0], [0.0, 0.0, 2000.0], [0.0, 0.0, 0.05]],
                &transform(),
                0.5,
            )
            .unwrap();

        assert_eq!(covered_pixels(&readback), 0);
    }

    #[test]
    fn test_target_cleared_between_renders() {
        let mut renderer = CpuDepthRenderer::new(WIDTH, HEIGHT).unwrap();
        renderer
            .render_depth(&[[0.0, 0.0, 5.0]], &transform(), 0.5)
            .unwrap();

        let readback = renderer.render_depth(&[], &transform(), 0.5).unwrap();
        assert_eq!(readback, DepthReadback::empty(WIDTH, HEIGHT));
    }

    #[test]
    fn test_covered_range() {
        assert_eq!(covered(27.0, 37.0, 64), 27..37);
        assert_eq!(covered(-3.0, 2.2, 64), 0..2);
        assert_eq!(covered(60.0, 70.0, 64), 60..64);
        assert_eq!(covered(5.2, 5.4, 64), 0..0);
        assert_eq!(covered(f32::NAN, 3.0, 64), 0..0);
    }
}
