// SPDX-License-Identifier: GPL-3.0-only

//! PLY point cloud loading with a spatial crop
//!
//! Only the `x`, `y` and `z` properties of the `vertex` element are read.
//! Faces, colors and normals are ignored. Points are kept in file order,
//! which the renderers rely on for deterministic depth ties.

use crate::constants::{FILTER_MAX_HEIGHT, FILTER_MAX_RADIUS_SQ};
use crate::errors::PointCloudError;
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, warn};

/// A point in world space
pub type Point = [f32; 3];

/// Spatial crop applied to every loaded point
///
/// A point survives when it lies strictly below `max_height` on the y axis
/// and strictly inside the vertical cylinder `x² + z² < max_radius_sq`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointFilter {
    pub max_height: f32,
    pub max_radius_sq: f32,
}

impl Default for PointFilter {
    fn default() -> Self {
        Self {
            max_height: FILTER_MAX_HEIGHT,
            max_radius_sq: FILTER_MAX_RADIUS_SQ,
        }
    }
}

impl PointFilter {
    /// Whether a point passes the crop
    pub fn keeps(&self, [x, y, z]: Point) -> bool {
        y < self.max_height && x * x + z * z < self.max_radius_sq
    }
}

/// Reads PLY files into a reusable point buffer
///
/// The buffer is cleared at the start of every load, so a failed load
/// leaves it empty rather than holding the previous cloud.
#[derive(Debug, Default)]
pub struct PointCloudLoader {
    filter: PointFilter,
    points: Vec<Point>,
}

impl PointCloudLoader {
    pub fn new(filter: PointFilter) -> Self {
        Self {
            filter,
            points: Vec::new(),
        }
    }

    /// Load `path` and return the points that pass the filter
    pub fn load(&mut self, path: &Path) -> Result<&[Point], PointCloudError> {
        self.points.clear();

        let file = File::open(path).map_err(|source| PointCloudError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = BufReader::new(file);

        let parser = Parser::<DefaultElement>::new();
        let header = parser
            .read_header(&mut reader)
            .map_err(|source| PointCloudError::Header {
                path: path.to_path_buf(),
                source,
            })?;
        let payload = parser
            .read_payload(&mut reader, &header)
            .map_err(|source| PointCloudError::Payload {
                path: path.to_path_buf(),
                source,
            })?;

        let Some(vertices) = payload.get("vertex") else {
            warn!(path = %path.display(), "PLY file has no vertex element");
            return Ok(&self.points);
        };

        self.points.reserve(vertices.len());
        for vertex in vertices {
            let point = [
                scalar(vertex, "x").ok_or_else(|| missing(path, "x"))?,
                scalar(vertex, "y").ok_or_else(|| missing(path, "y"))?,
                scalar(vertex, "z").ok_or_else(|| missing(path, "z"))?,
            ];
            if self.filter.keeps(point) {
                self.points.push(point);
            }
        }

        debug!(
            path = %path.display(),
            total = vertices.len(),
            kept = self.points.len(),
            "Point cloud loaded"
        );

        Ok(&self.points)
    }

    /// Points from the most recent load
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn filter(&self) -> &PointFilter {
        &self.filter
    }
}

fn missing(path: &Path, property: &'static str) -> PointCloudError {
    PointCloudError::MissingProperty {
        path: path.to_path_buf(),
        property,
    }
}

/// Scalar vertex property converted to f32
fn scalar(element: &DefaultElement, key: &str) -> Option<f32> {
    let value = match element.get(key)? {
        Property::Char(v) => *v as f32,
        Property::UChar(v) => *v as f32,
        Property::Short(v) => *v as f32,
        Property::UShort(v) => *v as f32,
        Property::Int(v) => *v as f32,
        Property::UInt(v) => *v as f32,
        Property::Float(v) => *v,
        Property::Double(v) => *v as f32,
        _ => return None,
    };
    Some(value)
}
