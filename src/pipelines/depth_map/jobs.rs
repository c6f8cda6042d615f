// SPDX-License-Identifier: GPL-3.0-only

//! Render jobs and job-list parsing
//!
//! A job list holds one job per line with five whitespace-separated fields:
//!
//! ```text
//! # cloud                  output              calibration        panel camera
//! clouds/frame_0100.ply    depth/00_05/0100.png calib/session.json 0     5
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Scanning stops at the
//! first malformed line; the jobs read before it are still returned.

use crate::calibration::CameraId;
use crate::errors::JobListError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One point cloud rendered from one rig camera
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub cloud: PathBuf,
    pub output: PathBuf,
    pub calibration: PathBuf,
    pub camera: CameraId,
}

impl Job {
    /// Build a job from the five positional fields
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> Result<Self, JobListError> {
        let [cloud, output, calibration, panel, camera] = fields else {
            return Err(JobListError::InvalidArguments(format!(
                "expected 5 fields (cloud output calibration panel camera), got {}",
                fields.len()
            )));
        };

        let index = |name: &str, value: &S| {
            value.as_ref().parse::<u32>().map_err(|_| {
                JobListError::InvalidArguments(format!(
                    "{} must be a non-negative integer, got '{}'",
                    name,
                    value.as_ref()
                ))
            })
        };

        Ok(Self {
            cloud: PathBuf::from(cloud.as_ref()),
            output: PathBuf::from(output.as_ref()),
            calibration: PathBuf::from(calibration.as_ref()),
            camera: CameraId::new(index("panel", panel)?, index("camera", camera)?),
        })
    }
}

/// Parse job-list text, stopping at the first malformed line
pub fn parse_job_list(text: &str) -> Vec<Job> {
    let mut jobs = Vec::new();

    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        match Job::from_fields(&fields) {
            Ok(job) => jobs.push(job),
            Err(e) => {
                warn!(
                    line = number + 1,
                    error = %e,
                    jobs = jobs.len(),
                    "Malformed job line, ignoring the rest of the list"
                );
                break;
            }
        }
    }

    jobs
}

/// Read and parse a job-list file
pub fn load_job_list(path: &Path) -> Result<Vec<Job>, JobListError> {
    let text = std::fs::read_to_string(path).map_err(|source| JobListError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let jobs = parse_job_list(&text);
    debug!(path = %path.display(), jobs = jobs.len(), "Job list loaded");
    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fields() {
        let job = Job::from_fields(&["a.ply", "a.png", "calib.json", "0", "5"]).unwrap();
        assert_eq!(job.cloud, PathBuf::from("a.ply"));
        assert_eq!(job.output, PathBuf::from("a.png"));
        assert_eq!(job.calibration, PathBuf::from("calib.json"));
        assert_eq!(job.camera, CameraId::new(0, 5));
    }

    #[test]
    fn test_from_fields_rejects_bad_index() {
        let err = Job::from_fields(&["a.ply", "a.png", "calib.json", "x", "5"]).unwrap_err();
        assert!(err.to_string().contains("panel"));

        let err = Job::from_fields(&["a.ply", "a.png"]).unwrap_err();
        assert!(matches!(err, JobListError::InvalidArguments(_)));
    }

    #[test]
    fn test_parse_skips_comments_and_blank_lines() {
        let text = "# header\n\na.ply a.png c.json 0 5\n   \n\tb.ply  b.png c.json 1 2\n";
        let jobs = parse_job_list(text);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].camera, CameraId::new(1, 2));
        assert_eq!(jobs[1].cloud, PathBuf::from("b.ply"));
    }

    #[test]
    fn test_parse_stops_at_malformed_line() {
        let text = "a.ply a.png c.json 0 5\nb.ply b.png c.json 0\nc.ply c.png c.json 0 7\n";
        let jobs = parse_job_list(text);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].camera, CameraId::new(0, 5));
    }

    #[test]
    fn test_load_missing_list() {
        let err = load_job_list(Path::new("/nonexistent/jobs.txt")).unwrap_err();
        assert!(matches!(err, JobListError::Io { .. }));
    }
}
