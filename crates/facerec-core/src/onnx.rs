//! [`Extractor`] backed by the SCRFD detector and ArcFace recognizer.

use std::path::{Path, PathBuf};

use crate::detector::FaceDetector;
use crate::extractor::{ExtractError, Extractor};
use crate::recognizer::FaceRecognizer;
use crate::types::Embedding;

pub const SCRFD_MODEL_FILE: &str = "det_10g.onnx";
pub const ARCFACE_MODEL_FILE: &str = "w600k_r50.onnx";

/// Default model directory: `$XDG_DATA_HOME/facerec/models`, else
/// `~/.local/share/facerec/models`.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("facerec")
        .join("models")
}

pub struct OnnxExtractor {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl OnnxExtractor {
    /// Load both models from `model_dir`.
    pub fn load(model_dir: &Path) -> Result<Self, ExtractError> {
        let scrfd = model_dir.join(SCRFD_MODEL_FILE);
        let arcface = model_dir.join(ARCFACE_MODEL_FILE);

        let detector = FaceDetector::load(&scrfd.to_string_lossy())?;
        let recognizer = FaceRecognizer::load(&arcface.to_string_lossy())?;

        Ok(Self { detector, recognizer })
    }
}

impl Extractor for OnnxExtractor {
    fn embed(&mut self, image: &[u8]) -> Result<Vec<Embedding>, ExtractError> {
        let decoded = image::load_from_memory(image).map_err(|e| ExtractError::Decode(e.to_string()))?;
        let rgb = decoded.to_rgb8();

        let faces = self.detector.detect(&rgb)?;
        tracing::debug!(
            width = rgb.width(),
            height = rgb.height(),
            faces = faces.len(),
            "faces detected"
        );

        faces
            .iter()
            .map(|face| self.recognizer.extract(&rgb, face).map_err(ExtractError::from))
            .collect()
    }
}
