// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use depth_map::errors::ConfigError;
use depth_map::{DepthMapConfig, PointFilter, RenderBackend};
use std::io::Write;

#[test]
fn test_config_default() {
    // Test that default config can be created
    let config = DepthMapConfig::default();

    // Check the rig defaults
    assert_eq!(config.resolution(), (384, 216));
    assert_eq!(config.near, 0.1);
    assert_eq!(config.far, 1000.0);
    assert_eq!(config.patch_size, 0.8);
    assert!(config.densify, "Densification should be enabled by default");
    assert_eq!(config.depth_scale, 10000.0);
    assert_eq!(config.backend, RenderBackend::Auto);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "display_scale": 0.5, "filter": {{ "max_height": 0.0 }}, "densify": false }}"#
    )
    .unwrap();

    let config = DepthMapConfig::load(file.path()).unwrap();
    assert_eq!(config.resolution(), (960, 540));
    assert_eq!(config.filter.max_height, 0.0);
    // Unlisted filter fields keep their defaults
    assert_eq!(config.filter.max_radius_sq, PointFilter::default().max_radius_sq);
    assert_eq!(config.effective_patch_size(), 0.0);
}

#[test]
fn test_config_round_trip() {
    let config = DepthMapConfig {
        backend: RenderBackend::Gpu,
        patch_size: 1.25,
        ..Default::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains(r#""backend":"gpu""#));
    let parsed: DepthMapConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_config_load_errors() {
    let err = DepthMapConfig::load("/nonexistent/config.json".as_ref()).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ \"near\": \"close\" }}").unwrap();
    let err = DepthMapConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn test_config_rejects_empty_resolution() {
    let config = DepthMapConfig {
        display_scale: 0.0001,
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Invalid {
            field: "base_width/base_height",
            ..
        })
    ));
}
