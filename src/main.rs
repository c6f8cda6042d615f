// SPDX-License-Identifier: GPL-3.0-only

use clap::Parser;
use clap::error::ErrorKind;
use depth_map::config::RenderBackend;
use depth_map::constants::app_info;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

mod cli;

/// Exit status for usage errors and fatal setup failures (-1 as a byte)
const EXIT_FATAL: u8 = 255;

#[derive(Parser, Debug)]
#[command(name = "depth_map")]
#[command(about = "Render calibrated depth maps from multi-camera rig point clouds")]
#[command(version = app_info::version())]
#[command(after_help = "usage: depth_map cloud.ply depth.png calib.json 0 5\n       depth_map list.txt")]
pub struct Cli {
    /// Either `<cloud> <output> <calibration> <panel> <camera>` or a job-list file
    #[arg(value_name = "ARGS", required = true, num_args = 1..)]
    args: Vec<String>,

    /// Renderer to use
    #[arg(short, long, value_enum)]
    backend: Option<RenderBackend>,

    /// JSON config file; command-line options override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Side length of the square each point is expanded into
    #[arg(long)]
    patch_size: Option<f32>,

    /// Render every point as a single pixel
    #[arg(long)]
    no_densify: bool,

    /// Factor between scene depth and 16-bit pixel values
    #[arg(long)]
    depth_scale: Option<f32>,

    /// Keep only points with y below this value
    #[arg(long, allow_negative_numbers = true)]
    max_height: Option<f32>,

    /// Keep only points with x² + z² below this value
    #[arg(long)]
    max_radius_sq: Option<f32>,
}

fn main() -> ExitCode {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=depth_map=debug, RUST_LOG=warn
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(EXIT_FATAL);
        }
    };

    match cli::run(&cli) {
        Ok(report) if report.all_succeeded() => ExitCode::SUCCESS,
        Ok(report) => {
            // Skipped jobs were already logged one by one
            error!(
                failed = report.failed.len(),
                total = report.total(),
                "Some jobs were skipped"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Fatal error");
            ExitCode::from(EXIT_FATAL)
        }
    }
}
