// SPDX-License-Identifier: GPL-3.0-only

//! Depth map pipeline
//!
//! Renders calibrated depth maps for batches of (point cloud, camera) jobs:
//! - Point clouds are loaded and cropped by [`crate::point_cloud`]
//! - Camera transforms come from [`crate::calibration`]
//! - A [`DepthRenderer`] splats the points offscreen (GPU or software)
//! - [`DepthImageEncoder`] writes the red channel as a 16-bit PNG

mod batch;
mod encoding;
mod jobs;
mod renderer;
mod software;

pub use batch::{BatchDriver, BatchReport};
pub use encoding::{DepthImage, DepthImageEncoder, depth_to_pixel};
pub use jobs::{Job, load_job_list, parse_job_list};
pub use renderer::{DepthReadback, DepthRenderer, create_renderer};
pub use software::CpuDepthRenderer;
