use crate::recognition::domain::face_embedding::FaceEmbedding;
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

/// Turns one face of a frame into an identity embedding.
///
/// `region` is in the frame's pixel coordinates. Implementations expect an
/// RGB frame.
pub trait FaceEncoder: Send {
    fn encode(
        &mut self,
        frame: &Frame,
        region: &FaceRegion,
    ) -> Result<FaceEmbedding, Box<dyn std::error::Error>>;
}
