// SPDX-License-Identifier: GPL-3.0-only

//! Multi-camera rig calibration
//!
//! - [`CalibrationStore`] keeps the most recently used calibration document
//!   resident and looks cameras up by rig identity.
//! - [`ProjectionBuilder`] turns a calibrated camera into the clip-space
//!   transform used by the depth renderers.

mod projection;
mod store;

pub use projection::{CameraTransform, ProjectionBuilder, ProjectionParams};
pub use store::CalibrationStore;

use std::fmt;

/// Identity of one physical camera in the capture rig
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CameraId {
    /// Rig panel index
    pub panel: u32,
    /// Camera index within the panel
    pub camera: u32,
}

impl CameraId {
    pub fn new(panel: u32, camera: u32) -> Self {
        Self { panel, camera }
    }

    /// Scalar key used by the rig tooling (`panel * 100 + camera`)
    pub fn code(&self) -> u64 {
        u64::from(self.panel) * 100 + u64::from(self.camera)
    }

    /// Parse a calibration entry name of the form `PP_CC`
    pub fn parse_name(name: &str) -> Option<Self> {
        let (panel, camera) = name.trim().split_once('_')?;
        let is_index = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !is_index(panel) || !is_index(camera) {
            return None;
        }
        Some(Self {
            panel: panel.parse().ok()?,
            camera: camera.parse().ok()?,
        })
    }
}

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}_{:02}", self.panel, self.camera)
    }
}

/// Intrinsic and extrinsic parameters of one rig camera
///
/// Matrices are row-major, exactly as stored in the calibration document.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraCalibration {
    pub id: CameraId,
    /// 3x3 pinhole intrinsics
    pub k: [[f64; 3]; 3],
    /// 3x3 world-to-camera rotation
    pub r: [[f64; 3]; 3],
    /// World-to-camera translation
    pub t: [f64; 3],
}

impl CameraCalibration {
    pub fn fx(&self) -> f64 {
        self.k[0][0]
    }

    pub fn fy(&self) -> f64 {
        self.k[1][1]
    }

    pub fn cx(&self) -> f64 {
        self.k[0][2]
    }

    pub fn cy(&self) -> f64 {
        self.k[1][2]
    }
}
