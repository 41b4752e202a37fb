use crate::detection::domain::face_detector::FaceDetector;
use crate::recognition::domain::face_embedding::FaceEmbedding;
use crate::recognition::domain::face_encoder::FaceEncoder;
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

/// Locates faces in a frame and embeds each of them.
///
/// Composes a [`FaceDetector`] with a [`FaceEncoder`]. The frame is converted
/// to RGB once, and each region is paired with the embedding computed from it,
/// in detector order.
pub struct FaceAnalyzer {
    detector: Box<dyn FaceDetector>,
    encoder: Box<dyn FaceEncoder>,
}

impl FaceAnalyzer {
    pub fn new(detector: Box<dyn FaceDetector>, encoder: Box<dyn FaceEncoder>) -> Self {
        Self { detector, encoder }
    }

    pub fn analyze(
        &mut self,
        frame: &Frame,
    ) -> Result<Vec<(FaceRegion, FaceEmbedding)>, Box<dyn std::error::Error>> {
        let rgb = frame.to_rgb();
        let regions = self.detector.detect(&rgb)?;
        regions
            .into_iter()
            .filter(|r| !r.is_empty())
            .map(|region| {
                let embedding = self.encoder.encode(&rgb, &region)?;
                Ok((region, embedding))
            })
            .collect()
    }
}
