// SPDX-License-Identifier: GPL-3.0-only

//! Calibration document cache
//!
//! Only one calibration document is resident at a time. Batches are usually
//! sorted by capture session, so consecutive jobs share a document and the
//! parse happens once per session.

use super::{CameraCalibration, CameraId};
use crate::errors::CalibrationError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Deserialize)]
struct CalibrationDocument {
    cameras: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct CameraEntry {
    name: String,
    #[serde(rename = "K")]
    k: [[f64; 3]; 3],
    #[serde(rename = "R")]
    r: [[f64; 3]; 3],
    t: [[f64; 1]; 3],
}

struct ResidentDocument {
    path: PathBuf,
    cameras: HashMap<CameraId, CameraCalibration>,
}

/// Per-camera calibration lookup backed by the last loaded document
#[derive(Default)]
pub struct CalibrationStore {
    resident: Option<ResidentDocument>,
    loads: usize,
}

impl CalibrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a camera, (re)loading the document when `path` changed
    pub fn get(
        &mut self,
        path: &Path,
        id: CameraId,
    ) -> Result<&CameraCalibration, CalibrationError> {
        let is_resident = self.resident.as_ref().is_some_and(|doc| doc.path == path);
        if !is_resident {
            // Drop the old document first so a failed load never serves stale cameras
            self.resident = None;
            let cameras = load_document(path)?;
            self.loads += 1;
            self.resident = Some(ResidentDocument {
                path: path.to_path_buf(),
                cameras,
            });
        }

        self.resident
            .as_ref()
            .and_then(|doc| doc.cameras.get(&id))
            .ok_or_else(|| CalibrationError::CameraNotFound {
                panel: id.panel,
                camera: id.camera,
                path: path.to_path_buf(),
            })
    }

    /// Path of the resident document, if any
    pub fn resident_path(&self) -> Option<&Path> {
        self.resident.as_ref().map(|doc| doc.path.as_path())
    }

    /// Number of documents parsed so far
    pub fn loads(&self) -> usize {
        self.loads
    }
}

fn load_document(path: &Path) -> Result<HashMap<CameraId, CameraCalibration>, CalibrationError> {
    info!(path = %path.display(), "Loading calibration");

    let text = std::fs::read_to_string(path).map_err(|source| CalibrationError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_document(&text).map_err(|source| CalibrationError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Index every well-formed camera entry of a calibration document
pub(crate) fn parse_document(
    text: &str,
) -> Result<HashMap<CameraId, CameraCalibration>, serde_json::Error> {
    let document: CalibrationDocument = serde_json::from_str(text)?;
    let mut cameras = HashMap::with_capacity(document.cameras.len());

    for (index, value) in document.cameras.into_iter().enumerate() {
        let entry: CameraEntry = match serde_json::from_value(value) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(index, error = %e, "Skipping malformed calibration entry");
                continue;
            }
        };

        let Some(id) = CameraId::parse_name(&entry.name) else {
            warn!(name = %entry.name, "Skipping calibration entry with unrecognised name");
            continue;
        };

        cameras.insert(
            id,
            CameraCalibration {
                id,
                k: entry.k,
                r: entry.r,
                t: [entry.t[0][0], entry.t[1][0], entry.t[2][0]],
            },
        );
    }

    debug!(cameras = cameras.len(), "Calibration document indexed");
    Ok(cameras)
}

/// Two-camera document with one malformed and one unnamed entry
#[cfg(test)]
pub(crate) const SAMPLE_DOCUMENT: &str = r#"{
    "calibDataSource": "sample",
    "cameras": [
        {
            "name": "00_05",
            "type": "hd",
            "resolution": [1920, 1080],
            "K": [[1396.52, 0.0, 933.738], [0.0, 1393.52, 560.443], [0.0, 0.0, 1.0]],
            "distCoef": [0.0, 0.0, 0.0, 0.0, 0.0],
            "R": [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            "t": [[-10.7], [143.7], [277.0]]
        },
        {
            "name": "00_06",
            "K": [[1400.0, 0.0, 960.0], [0.0, 1400.0, 540.0], [0.0, 0.0, 1.0]],
            "R": [[0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [-1.0, 0.0, 0.0]],
            "t": [[0.0], [0.0], [300.0]]
        },
        { "name": "broken_entry" },
        {
            "name": "vga",
            "K": [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            "R": [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            "t": [[0.0], [0.0], [0.0]]
        }
    ]
}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_sample() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE_DOCUMENT.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_document_skips_bad_entries() {
        let cameras = parse_document(SAMPLE_DOCUMENT).unwrap();
        assert_eq!(cameras.len(), 2);

        let camera = &cameras[&CameraId::new(0, 5)];
        assert_eq!(camera.fx(), 1396.52);
        assert_eq!(camera.cy(), 560.443);
        assert_eq!(camera.t, [-10.7, 143.7, 277.0]);
    }

    #[test]
    fn test_document_loaded_once_per_path() {
        let file = write_sample();
        let mut store = CalibrationStore::new();

        store.get(file.path(), CameraId::new(0, 5)).unwrap();
        store.get(file.path(), CameraId::new(0, 6)).unwrap();
        assert_eq!(store.loads(), 1);
        assert_eq!(store.resident_path(), Some(file.path()));
    }

    #[test]
    fn test_missing_camera_is_an_error() {
        let file = write_sample();
        let mut store = CalibrationStore::new();

        let err = store.get(file.path(), CameraId::new(9, 9)).unwrap_err();
        assert!(matches!(
            err,
            CalibrationError::CameraNotFound {
                panel: 9,
                camera: 9,
                ..
            }
        ));
    }

    #[test]
    fn test_unparsable_document_is_not_cached() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        let mut store = CalibrationStore::new();

        let err = store.get(file.path(), CameraId::new(0, 5)).unwrap_err();
        assert!(matches!(err, CalibrationError::Parse { .. }));
        assert!(store.resident_path().is_none());
        assert_eq!(store.loads(), 0);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let mut store = CalibrationStore::new();
        let err = store
            .get(Path::new("/nonexistent/calib.json"), CameraId::new(0, 5))
            .unwrap_err();
        assert!(matches!(err, CalibrationError::Io { .. }));
    }
}
