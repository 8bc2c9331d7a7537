use std::path::Path;

use crate::detection::domain::face_detector::{Detection, FaceDetector};
use crate::shared::frame::Frame;

use super::face_embedder::FaceEmbedder;
use super::face_locator::FaceLocator;

/// Default minimum locator confidence for a face to be embedded.
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// Two-stage detector: locate faces, then embed each located crop.
pub struct OnnxFaceDetector {
    locator: FaceLocator,
    embedder: FaceEmbedder,
}

impl OnnxFaceDetector {
    pub fn new(
        locator_path: &Path,
        embedder_path: &Path,
        confidence: f64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            locator: FaceLocator::new(locator_path, confidence)?,
            embedder: FaceEmbedder::new(embedder_path)?,
        })
    }
}

impl FaceDetector for OnnxFaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let faces = self.locator.locate(frame)?;
        faces
            .into_iter()
            .map(|face| {
                Ok(Detection {
                    bbox: face.bbox,
                    confidence: face.confidence,
                    embedding: self.embedder.embed(frame, face.bbox)?,
                })
            })
            .collect()
    }
}
