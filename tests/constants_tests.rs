// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for constants module

use depth_map::constants::{self, scaled_resolution};

#[test]
fn test_default_output_size() {
    // The rig's 1920x1080 sensors are rendered at a fifth of their size
    assert_eq!(
        scaled_resolution(
            constants::BASE_WIDTH,
            constants::BASE_HEIGHT,
            constants::DISPLAY_SCALE
        ),
        (384, 216)
    );
}

#[test]
fn test_clip_planes_are_ordered() {
    assert!(constants::NEAR_PLANE > 0.0);
    assert!(constants::FAR_PLANE > constants::NEAR_PLANE);
}

#[test]
fn test_depth_scale_covers_expected_range() {
    // Largest encodable depth is u16::MAX / scale
    let max_depth = u16::MAX as f32 / constants::DEPTH_SCALE;
    assert!((max_depth - 6.5535).abs() < 1e-4);
}

#[test]
fn test_version_is_set() {
    assert!(!constants::app_info::version().is_empty());
}
