use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Sequential decoder for a video (or a still image treated as a one-frame
/// video).
///
/// `open` acquires the underlying resource and `close` releases it; callers
/// that need guaranteed release wrap the reader in a scope guard such as
/// [`FrameSampler`](crate::pipeline::frame_sampler::FrameSampler).
pub trait VideoReader: Send {
    /// Opens the source and returns its metadata. Re-opening resets the
    /// read position to the first frame.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Returns a lazy iterator over frames in decode order.
    ///
    /// An `Err` item describes a single frame that could not be decoded;
    /// iteration may continue past it. The iterator ends when the source
    /// has no more frames.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    /// Releases any resources held by the reader. Must be idempotent.
    fn close(&mut self);
}
