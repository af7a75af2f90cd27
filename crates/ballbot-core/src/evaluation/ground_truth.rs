//! Ground-truth annotation sources

use crate::types::GroundTruthObject;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Provides the annotated balls of a frame, keyed by frame identifier.
///
/// A frame without annotations has an empty ground truth; that is not an error.
pub trait GroundTruthSource {
    fn ground_truth(&self, frame_id: &str) -> Vec<GroundTruthObject>;
}

impl GroundTruthSource for HashMap<String, Vec<GroundTruthObject>> {
    fn ground_truth(&self, frame_id: &str) -> Vec<GroundTruthObject> {
        self.get(frame_id).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct AnnotationFile {
    #[serde(default)]
    balls: Vec<GroundTruthObject>,
}

/// Directory of `<frame stem>.json` files, each `{ "balls": [{x, y, radius}] }`
#[derive(Debug, Clone)]
pub struct JsonGroundTruthDir {
    dir: PathBuf,
}

impl JsonGroundTruthDir {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Annotation path for a frame id such as `court_01.jpg`
    pub fn annotation_path(&self, frame_id: &str) -> PathBuf {
        let stem = Path::new(frame_id)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| frame_id.to_string());
        self.dir.join(format!("{}.json", stem))
    }

    fn load(path: &Path) -> Result<Vec<GroundTruthObject>> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read annotation: {:?}", path))?;
        let file: AnnotationFile = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid annotation: {:?}", path))?;
        Ok(file.balls)
    }
}

impl GroundTruthSource for JsonGroundTruthDir {
    fn ground_truth(&self, frame_id: &str) -> Vec<GroundTruthObject> {
        let path = self.annotation_path(frame_id);
        if !path.exists() {
            log::debug!("no annotation for {}, treating as empty", frame_id);
            return Vec::new();
        }

        match Self::load(&path) {
            Ok(balls) => balls,
            Err(e) => {
                log::warn!("{:#}; treating {} as unannotated", e, frame_id);
                Vec::new()
            }
        }
    }
}
