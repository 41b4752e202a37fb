use std::path::Path;

use crate::pipeline::scan_error::ScanError;
use crate::recognition::domain::face_analyzer::FaceAnalyzer;
use crate::recognition::domain::face_embedding::FaceEmbedding;
use crate::video::domain::video_reader::VideoReader;

/// Encodes the person to look for from a reference photo.
///
/// The image is decoded through `reader` (a still image reads as a one-frame
/// video). The first face in detector order is the identity; any further
/// faces are ignored with a warning.
pub fn encode_reference(
    analyzer: &mut FaceAnalyzer,
    reader: &mut dyn VideoReader,
    path: &Path,
) -> Result<FaceEmbedding, ScanError> {
    let unreadable = |source: Box<dyn std::error::Error>| ScanError::ReferenceUnreadable {
        path: path.to_path_buf(),
        source,
    };

    reader.open(path).map_err(unreadable)?;
    let first = reader.frames().next();
    reader.close();

    let frame = match first {
        Some(Ok(frame)) => frame,
        Some(Err(e)) => return Err(unreadable(e)),
        None => return Err(unreadable("image contains no picture".into())),
    };

    let faces = analyzer
        .analyze(&frame)
        .map_err(|source| ScanError::Analysis { index: 0, source })?;

    let face_count = faces.len();
    let (region, embedding) = faces
        .into_iter()
        .next()
        .ok_or_else(|| ScanError::NoFaceFound {
            path: path.to_path_buf(),
        })?;

    if face_count > 1 {
        log::warn!(
            "Reference image has {face_count} faces; using the most confident one and ignoring {}",
            face_count - 1
        );
    }
    log::info!(
        "Reference face at ({}, {}) {}x{}, {}-d embedding",
        region.left,
        region.top,
        region.width(),
        region.height(),
        embedding.dim()
    );
    Ok(embedding)
}
