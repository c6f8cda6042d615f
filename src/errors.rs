// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the depth map renderer
//!
//! Each stage of a job has its own error enum. Stage errors are per-job and
//! are logged by the batch driver; [`AppError`] covers everything that can
//! stop the process before or outside the batch loop.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Job list could not be read
    #[error("Job list error: {0}")]
    JobList(#[from] JobListError),
    /// Renderer could not be created
    #[error("Renderer error: {0}")]
    Render(#[from] RenderError),
}

/// Calibration document errors
#[derive(Debug, Error)]
pub enum CalibrationError {
    /// Calibration file could not be opened or read
    #[error("Failed to read calibration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Calibration file is not valid JSON or has the wrong shape
    #[error("Failed to parse calibration {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// Requested camera is not present in the calibration document
    #[error("Camera {panel:02}_{camera:02} not found in calibration {path}")]
    CameraNotFound {
        panel: u32,
        camera: u32,
        path: PathBuf,
    },
}

/// Point cloud loading errors
#[derive(Debug, Error)]
pub enum PointCloudError {
    /// File could not be opened
    #[error("Failed to open point cloud {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// PLY header could not be read
    #[error("Failed to read PLY header of {path}: {source}")]
    Header {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// PLY body could not be read
    #[error("Failed to read PLY payload of {path}: {source}")]
    Payload {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Vertex element lacks a coordinate property
    #[error("Vertex in {path} has no scalar '{property}' property")]
    MissingProperty {
        path: PathBuf,
        property: &'static str,
    },
}

/// Offscreen rendering errors
#[derive(Debug, Error)]
pub enum RenderError {
    /// No usable GPU adapter or device
    #[error("GPU initialization failed: {0}")]
    GpuInit(String),
    /// Reading the render target back to the CPU failed
    #[error("Readback failed: {0}")]
    Readback(String),
    /// Requested target size is unusable
    #[error("Invalid render target size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    /// Point cloud does not fit in one device buffer
    #[error("{points} points exceed the device buffer limit of {limit} bytes")]
    TooManyPoints { points: usize, limit: u64 },
}

/// Depth image encoding errors
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Readback dimensions disagree with its buffer length
    #[error("Readback buffer holds {actual} floats, expected {expected}")]
    SizeMismatch { actual: usize, expected: usize },
    /// Output directory could not be created
    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Image could not be written
    #[error("Failed to save {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Job list errors
#[derive(Debug, Error)]
pub enum JobListError {
    /// List file could not be read
    #[error("Failed to read job list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Command-line job arguments are malformed
    #[error("Invalid job arguments: {0}")]
    InvalidArguments(String),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Config file is not valid JSON
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// A value is out of range
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Failure of a single batch job, tagged with the stage that failed
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    PointCloud(#[from] PointCloudError),
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}
