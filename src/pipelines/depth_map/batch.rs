// SPDX-License-Identifier: GPL-3.0-only

//! Batch driver
//!
//! Runs jobs strictly in input order through load, projection, render and
//! encode. A failing stage skips its job and the batch moves on; no output
//! file is written for a skipped job.

use super::encoding::DepthImageEncoder;
use super::jobs::Job;
use super::renderer::{DepthRenderer, create_renderer};
use crate::calibration::{ProjectionBuilder, ProjectionParams};
use crate::config::DepthMapConfig;
use crate::errors::{AppResult, JobError};
use crate::point_cloud::PointCloudLoader;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Outcome of a batch run
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Jobs that produced an image
    pub succeeded: usize,
    /// Index into the job list and the error of every skipped job
    pub failed: Vec<(usize, JobError)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Owns every per-run resource and reuses it across jobs
pub struct BatchDriver {
    loader: PointCloudLoader,
    projections: ProjectionBuilder,
    renderer: Box<dyn DepthRenderer>,
    encoder: DepthImageEncoder,
    patch_size: f32,
}

impl BatchDriver {
    /// Validate `config` and create the configured renderer
    pub fn new(config: &DepthMapConfig) -> AppResult<Self> {
        config.validate()?;
        let (width, height) = config.resolution();
        let renderer = create_renderer(config.backend, width, height)?;
        Ok(Self::with_renderer(config, renderer))
    }

    /// Use an existing renderer; its size overrides the configured resolution
    pub fn with_renderer(config: &DepthMapConfig, renderer: Box<dyn DepthRenderer>) -> Self {
        let (width, height) = renderer.size();
        let params = ProjectionParams {
            width,
            height,
            ..ProjectionParams::from_config(config)
        };

        Self {
            loader: PointCloudLoader::new(config.filter),
            projections: ProjectionBuilder::new(params),
            renderer,
            encoder: DepthImageEncoder::new(config.depth_scale),
            patch_size: config.effective_patch_size(),
        }
    }

    /// Render one job to its output image
    pub fn run_job(&mut self, job: &Job) -> Result<(), JobError> {
        let points = self.loader.load(&job.cloud)?;
        if points.is_empty() {
            warn!(cloud = %job.cloud.display(), "No points left after filtering");
        }

        let transform = self.projections.get_transform(&job.calibration, job.camera)?;
        let readback = self.renderer.render_depth(points, &transform, self.patch_size)?;
        self.encoder.encode_to_file(&readback, &job.output)?;

        Ok(())
    }

    /// Run every job in order, collecting failures instead of stopping
    pub fn run(&mut self, jobs: &[Job]) -> BatchReport {
        let mut report = BatchReport::default();
        let started = Instant::now();
        info!(
            jobs = jobs.len(),
            renderer = self.renderer.name(),
            depth_scale = self.encoder.depth_scale(),
            filter = ?self.loader.filter(),
            "Batch starting"
        );

        for (index, job) in jobs.iter().enumerate() {
            info!(job = index, "reading {} at cam {}", job.cloud.display(), job.camera);

            let job_started = Instant::now();
            match self.run_job(job) {
                Ok(()) => {
                    debug!(
                        job = index,
                        output = %job.output.display(),
                        elapsed_ms = job_started.elapsed().as_millis() as u64,
                        "Job finished"
                    );
                    report.succeeded += 1;
                }
                Err(e) => {
                    error!(job = index, cloud = %job.cloud.display(), error = %e, "Job skipped");
                    report.failed.push((index, e));
                }
            }
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failed.len(),
            renderer = self.renderer.name(),
            calibration_loads = self.projections.store().loads(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch complete"
        );

        report
    }

    pub fn renderer_name(&self) -> &'static str {
        self.renderer.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CameraId;
    use crate::config::RenderBackend;
    use crate::errors::{CalibrationError, PointCloudError};
    use crate::pipelines::depth_map::CpuDepthRenderer;
    use std::io::Write;
    use std::path::Path;

    const CALIBRATION: &str = r#"{
        "cameras": [{
            "name": "00_00",
            "K": [[500.0, 0.0, 960.0], [0.0, 500.0, 540.0], [0.0, 0.0, 1.0]],
            "R": [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            "t": [[0.0], [0.0], [0.0]]
        }]
    }"#;

    fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn cpu_driver() -> BatchDriver {
        let config = DepthMapConfig {
            backend: RenderBackend::Cpu,
            ..Default::default()
        };
        BatchDriver::new(&config).unwrap()
    }

    #[test]
    fn test_job_writes_image() {
        let dir = tempfile::tempdir().unwrap();
        let calibration = write(dir.path(), "calib.json", CALIBRATION);
        let cloud = write(
            dir.path(),
            "cloud.ply",
            "ply\nformat ascii 1.0\nelement vertex 2\nproperty float x\nproperty float y\nproperty float z\nend_header\n0 -6 30\n0 0 30\n",
        );
        let job = Job {
            cloud,
            output: dir.path().join("out").join("depth.png"),
            calibration,
            camera: CameraId::new(0, 0),
        };

        let config = DepthMapConfig {
            backend: RenderBackend::Cpu,
            depth_scale: 1000.0,
            ..Default::default()
        };
        let mut driver = BatchDriver::new(&config).unwrap();
        driver.run_job(&job).unwrap();

        let image = image::open(&job.output).unwrap().into_luma16();
        assert_eq!(image.dimensions(), (384, 216));

        // Projects to u = 192, v = 100 * -6 / 30 + 108 = 88 and covers a
        // 2x2 block; the y = 0 point is filtered out
        assert_eq!(image.get_pixel(192, 88).0, [30000]);
        assert_eq!(image.get_pixel(191, 87).0, [30000]);
        assert_eq!(image.pixels().filter(|p| p.0[0] != 0).count(), 4);
    }

    #[test]
    fn test_stage_errors_are_tagged() {
        let dir = tempfile::tempdir().unwrap();
        let calibration = write(dir.path(), "calib.json", CALIBRATION);
        let cloud = write(
            dir.path(),
            "cloud.ply",
            "ply\nformat ascii 1.0\nelement vertex 0\nproperty float x\nproperty float y\nproperty float z\nend_header\n",
        );
        let mut driver = cpu_driver();

        let missing_cloud = Job {
            cloud: dir.path().join("missing.ply"),
            output: dir.path().join("a.png"),
            calibration: calibration.clone(),
            camera: CameraId::new(0, 0),
        };
        let missing_camera = Job {
            cloud,
            output: dir.path().join("b.png"),
            calibration,
            camera: CameraId::new(3, 3),
        };

        let report = driver.run(&[missing_cloud, missing_camera]);
        assert_eq!(report.succeeded, 0);
        assert!(matches!(
            report.failed[0],
            (0, JobError::PointCloud(PointCloudError::Open { .. }))
        ));
        assert!(matches!(
            report.failed[1],
            (1, JobError::Calibration(CalibrationError::CameraNotFound { .. }))
        ));
        assert!(!dir.path().join("a.png").exists());
        assert!(!dir.path().join("b.png").exists());
    }

    #[test]
    fn test_renderer_size_drives_projection() {
        let renderer = Box::new(CpuDepthRenderer::new(32, 16).unwrap());
        let driver = BatchDriver::with_renderer(&DepthMapConfig::default(), renderer);
        assert_eq!(driver.projections.params().width, 32);
        assert_eq!(driver.projections.params().height, 16);
        assert_eq!(driver.renderer_name(), "cpu");
    }

    #[test]
    fn test_config_reaches_stages() {
        let config = DepthMapConfig {
            backend: RenderBackend::Cpu,
            depth_scale: 250.0,
            filter: crate::point_cloud::PointFilter {
                max_height: 1.5,
                max_radius_sq: 9.0,
            },
            ..Default::default()
        };
        let driver = BatchDriver::new(&config).unwrap();
        assert_eq!(driver.encoder.depth_scale(), 250.0);
        assert_eq!(driver.loader.filter(), &config.filter);
    }
}
