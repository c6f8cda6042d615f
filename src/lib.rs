// SPDX-License-Identifier: GPL-3.0-only

//! depth_map - calibrated depth maps from multi-camera rig point clouds
//!
//! This library renders a point cloud as seen from one camera of a
//! calibrated capture rig and stores the result as a 16-bit depth image.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`calibration`]: Calibration documents and camera transforms
//! - [`point_cloud`]: PLY loading and spatial cropping
//! - [`pipelines`]: Offscreen rendering, encoding and the batch driver
//! - [`shaders`]: WGSL shaders and the GPU renderer
//! - [`gpu`]: Headless wgpu device creation
//! - [`config`]: Run configuration
//!
//! # Example
//!
//! ```ignore
//! use depth_map::config::DepthMapConfig;
//! use depth_map::pipelines::depth_map::{BatchDriver, load_job_list};
//!
//! let jobs = load_job_list("jobs.txt".as_ref())?;
//! let report = BatchDriver::new(&DepthMapConfig::default())?.run(&jobs);
//! ```

pub mod calibration;
pub mod config;
pub mod constants;
pub mod errors;
pub mod gpu;
pub mod pipelines;
pub mod point_cloud;
pub mod shaders;

// Re-export commonly used types
pub use calibration::{CalibrationStore, CameraId, CameraTransform, ProjectionBuilder};
pub use config::{DepthMapConfig, RenderBackend};
pub use errors::{AppError, AppResult};
pub use pipelines::depth_map::{BatchDriver, BatchReport, DepthImageEncoder, Job};
pub use point_cloud::{PointCloudLoader, PointFilter};
