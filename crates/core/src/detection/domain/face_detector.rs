use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

/// Domain interface for locating faces in a frame.
///
/// Implementations return regions in a deterministic order (the ONNX
/// detector uses descending confidence) and an empty vector when the frame
/// has no faces. Stateful backends are allowed, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceRegion>, Box<dyn std::error::Error>>;
}
