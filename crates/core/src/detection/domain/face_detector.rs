use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// One face found in a frame, with the embedding computed from its crop.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub embedding: Vec<f32>,
}

/// Domain interface for face detection and embedding.
///
/// Returns every face above the implementation's confidence threshold.
/// Implementations may hold inference sessions that need exclusive access,
/// hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;
}
