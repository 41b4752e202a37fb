use std::path::Path;

use crate::shared::frame::Frame;

/// Persists a single frame (typically a face crop) as an image file.
pub trait ImageWriter: Send {
    /// Writes `frame` to `path`. When `max_edge` is set the image is
    /// downscaled so its longest edge fits, keeping the aspect ratio.
    fn write(
        &self,
        path: &Path,
        frame: &Frame,
        max_edge: Option<u32>,
    ) -> Result<(), Box<dyn std::error::Error>>;
}
