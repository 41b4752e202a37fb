use std::path::PathBuf;

use serde::Serialize;

/// Stream properties reported by a reader when a source is opened.
///
/// `fps == 0.0` means the rate is unknown (and is how still images are
/// described); `total_frames == 0` means the container did not report a
/// frame count.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Frame rate, or `None` when the source did not report a usable one.
    pub fn frame_rate(&self) -> Option<f64> {
        (self.fps.is_finite() && self.fps > 0.0).then_some(self.fps)
    }

    /// Frame count, or `None` when unknown.
    pub fn frame_count(&self) -> Option<usize> {
        (self.total_frames > 0).then_some(self.total_frames)
    }

    pub fn duration_secs(&self) -> Option<f64> {
        Some(self.frame_count()? as f64 / self.frame_rate()?)
    }
}
