// SPDX-License-Identifier: GPL-3.0-only

//! Clip-space transforms for calibrated pinhole cameras
//!
//! Instead of a perspective matrix built from a field of view, the camera
//! intrinsics are used directly as the projection: K maps camera space to
//! pixel space (with the homogeneous w taken from camera z), and an
//! orthographic matrix over the pixel rectangle maps pixels to NDC. Matrices
//! follow the OpenGL convention (NDC depth in [-1, 1], y up, row 0 of the
//! pixel rectangle at NDC y = +1).

use super::{CalibrationStore, CameraCalibration, CameraId};
use crate::config::DepthMapConfig;
use crate::errors::CalibrationError;
use glam::{Mat4, Vec3};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Output geometry shared by every camera in a batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionParams {
    pub width: u32,
    pub height: u32,
    pub near: f32,
    pub far: f32,
    /// Uniform factor applied to fx, fy, cx and cy
    pub display_scale: f32,
}

impl ProjectionParams {
    pub fn from_config(config: &DepthMapConfig) -> Self {
        let (width, height) = config.resolution();
        Self {
            width,
            height,
            near: config.near,
            far: config.far,
            display_scale: config.display_scale,
        }
    }
}

impl Default for ProjectionParams {
    fn default() -> Self {
        Self::from_config(&DepthMapConfig::default())
    }
}

/// Projection, view and their product for one camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTransform {
    /// Camera space to clip space
    pub projection: Mat4,
    /// World space to camera space
    pub view: Mat4,
    /// World space to clip space (projection × view × identity model)
    pub mvp: Mat4,
}

impl CameraTransform {
    /// Build the transform for a calibrated camera
    pub fn from_calibration(camera: &CameraCalibration, params: &ProjectionParams) -> Self {
        let projection = intrinsic_projection(camera, params);
        let view = view_matrix(camera);
        let model = Mat4::IDENTITY;

        Self {
            projection,
            view,
            mvp: projection * view * model,
        }
    }

    /// World point in camera space; z is the depth along the optical axis
    pub fn to_camera(&self, point: Vec3) -> Vec3 {
        self.view.transform_point3(point)
    }
}

/// Orthographic pixel-rectangle matrix times the intrinsics-as-projection matrix
fn intrinsic_projection(camera: &CameraCalibration, params: &ProjectionParams) -> Mat4 {
    let scale = params.display_scale;
    let fx = camera.fx() as f32 * scale;
    let fy = camera.fy() as f32 * scale;
    let cx = camera.cx() as f32 * scale;
    let cy = camera.cy() as f32 * scale;

    let (near, far) = (params.near, params.far);
    let (l, r) = (0.0, params.width as f32);
    let (b, t) = (params.height as f32, 0.0);
    let tx = -(r + l) / (r - l);
    let ty = -(t + b) / (t - b);
    let tz = -(far + near) / (far - near);

    // Written row-major, transposed into glam's column-major layout
    #[rustfmt::skip]
    let ortho = Mat4::from_cols_array(&[
        2.0 / (r - l), 0.0,           0.0,                  tx,
        0.0,           2.0 / (t - b), 0.0,                  ty,
        0.0,           0.0,           -2.0 / (far - near),  tz,
        0.0,           0.0,           0.0,                  1.0,
    ])
    .transpose();

    #[rustfmt::skip]
    let intrinsic = Mat4::from_cols_array(&[
        fx,  0.0, cx,            0.0,
        0.0, fy,  cy,            0.0,
        0.0, 0.0, -(near + far), near * far,
        0.0, 0.0, 1.0,           0.0,
    ])
    .transpose();

    ortho * intrinsic
}

/// Row-major [R | t] from the calibration as a column-major matrix
fn view_matrix(camera: &CameraCalibration) -> Mat4 {
    let r = camera.r.map(|row| row.map(|v| v as f32));
    let t = camera.t.map(|v| v as f32);

    #[rustfmt::skip]
    let rt = [
        r[0][0], r[0][1], r[0][2], t[0],
        r[1][0], r[1][1], r[1][2], t[1],
        r[2][0], r[2][1], r[2][2], t[2],
        0.0,     0.0,     0.0,     1.0,
    ];

    Mat4::from_cols_array(&rt).transpose()
}

struct CachedTransform {
    calibration_path: PathBuf,
    camera: CameraId,
    transform: CameraTransform,
}

/// Builds camera transforms, remembering only the most recent one
///
/// Batches are grouped by camera, so a single entry catches nearly every
/// repeat. The output geometry is fixed at construction, which keeps the
/// cached entry valid for the whole run.
pub struct ProjectionBuilder {
    params: ProjectionParams,
    store: CalibrationStore,
    cached: Option<CachedTransform>,
    computed: usize,
}

impl ProjectionBuilder {
    pub fn new(params: ProjectionParams) -> Self {
        Self::with_store(params, CalibrationStore::new())
    }

    pub fn with_store(params: ProjectionParams, store: CalibrationStore) -> Self {
        Self {
            params,
            store,
            cached: None,
            computed: 0,
        }
    }

    /// Combined model-view-projection matrix for a rig camera
    pub fn get_mvp(
        &mut self,
        calibration_path: &Path,
        camera: CameraId,
    ) -> Result<Mat4, CalibrationError> {
        Ok(self.get_transform(calibration_path, camera)?.mvp)
    }

    /// Full transform for a rig camera, served from the cache when it was
    /// the last one requested
    pub fn get_transform(
        &mut self,
        calibration_path: &Path,
        camera: CameraId,
    ) -> Result<CameraTransform, CalibrationError> {
        if let Some(cached) = &self.cached
            && cached.camera == camera
            && cached.calibration_path == calibration_path
        {
            return Ok(cached.transform);
        }

        let calibration = self.store.get(calibration_path, camera)?;
        let transform = CameraTransform::from_calibration(calibration, &self.params);
        self.computed += 1;

        debug!(
            camera = %calibration.id,
            key = camera.code(),
            width = self.params.width,
            height = self.params.height,
            "Computed camera transform"
        );

        self.cached = Some(CachedTransform {
            calibration_path: calibration_path.to_path_buf(),
            camera,
            transform,
        });
        Ok(transform)
    }

    pub fn params(&self) -> &ProjectionParams {
        &self.params
    }

    pub fn store(&self) -> &CalibrationStore {
        &self.store
    }

    /// Number of transforms computed (cache misses) so far
    pub fn computed(&self) -> usize {
        self.computed
    }
}
