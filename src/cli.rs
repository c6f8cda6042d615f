// SPDX-License-Identifier: GPL-3.0-only

//! CLI command handling
//!
//! This module turns parsed arguments into a run:
//! - Resolving the configuration (defaults, config file, flags)
//! - Resolving the jobs (single job or job-list file)
//! - Running the batch

use crate::Cli;
use depth_map::config::DepthMapConfig;
use depth_map::errors::{AppResult, JobListError};
use depth_map::pipelines::depth_map::{BatchDriver, BatchReport, Job, load_job_list};
use std::path::Path;
use tracing::{debug, info};

/// Run the batch described by the command line
pub fn run(cli: &Cli) -> AppResult<BatchReport> {
    info!(version = depth_map::constants::app_info::version(), "depth_map starting");

    let config = resolve_config(cli)?;
    let jobs = resolve_jobs(&cli.args)?;
    info!(jobs = jobs.len(), "Jobs queued");

    let mut driver = BatchDriver::new(&config)?;
    Ok(driver.run(&jobs))
}

/// Defaults, then the config file, then individual flags
fn resolve_config(cli: &Cli) -> AppResult<DepthMapConfig> {
    let mut config = match &cli.config {
        Some(path) => DepthMapConfig::load(path)?,
        None => DepthMapConfig::default(),
    };

    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(patch_size) = cli.patch_size {
        config.patch_size = patch_size;
    }
    if cli.no_densify {
        config.densify = false;
    }
    if let Some(depth_scale) = cli.depth_scale {
        config.depth_scale = depth_scale;
    }
    if let Some(max_height) = cli.max_height {
        config.filter.max_height = max_height;
    }
    if let Some(max_radius_sq) = cli.max_radius_sq {
        config.filter.max_radius_sq = max_radius_sq;
    }

    config.validate()?;
    debug!(?config, "Configuration resolved");
    Ok(config)
}

/// Five positional arguments form one job; a single one names a job list
fn resolve_jobs(args: &[String]) -> AppResult<Vec<Job>> {
    match args {
        [list] => Ok(load_job_list(Path::new(list))?),
        [_, _, _, _, _] => Ok(vec![Job::from_fields(args)?]),
        _ => Err(JobListError::InvalidArguments(format!(
            "expected 1 or 5 arguments, got {}\n\
             usage: depth_map cloud.ply depth.png calib.json 0 5\n\
             usage: depth_map list.txt",
            args.len()
        ))
        .into()),
    }
}
