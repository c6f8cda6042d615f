// SPDX-License-Identifier: GPL-3.0-only

//! GPU-accelerated depth splatting
//!
//! This module renders calibrated point clouds offscreen with a wgpu render
//! pipeline and reads the depth channel back for encoding.

mod processor;

pub use processor::GpuDepthRenderer;

/// Patch and single-pixel vertex stages plus the depth fragment stage
pub const DEPTH_SPLAT_WGSL: &str = include_str!("depth_splat.wgsl");

#[cfg(test)]
mod tests {
    use super::*;

    /// Validate that a WGSL shader compiles successfully using naga
    fn validate_shader(name: &str, source: &str) {
        let result = naga::front::wgsl::parse_str(source);
        match result {
            Ok(module) => {
                let info = naga::valid::Validator::new(
                    naga::valid::ValidationFlags::all(),
                    naga::valid::Capabilities::all(),
                )
                .validate(&module);

                if let Err(e) = info {
                    panic!("Shader '{}' validation failed: {:?}", name, e);
                }
            }
            Err(e) => {
                panic!("Shader '{}' parse failed: {:?}", name, e);
            }
        }
    }

    #[test]
    fn test_depth_splat_shader_validates() {
        validate_shader("depth_splat", DEPTH_SPLAT_WGSL);
    }

    #[test]
    fn test_depth_splat_entry_points() {
        let module = naga::front::wgsl::parse_str(DEPTH_SPLAT_WGSL).unwrap();
        let names: Vec<&str> = module
            .entry_points
            .iter()
            .map(|ep| ep.name.as_str())
            .collect();
        assert_eq!(names, vec!["vs_patch", "vs_point", "fs_depth"]);
    }
}
