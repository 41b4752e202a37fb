use serde::{Deserialize, Serialize};

use crate::pipeline::frame_sampler::SamplerStats;
use crate::shared::video_metadata::VideoMetadata;

/// One matched face in the report.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub timestamp: f64,
    pub frame_index: usize,
    pub distance: f64,
}

/// Result of one scan: matches in chronological order plus how the video
/// was read.
#[derive(Clone, Debug, Serialize)]
pub struct ScanReport {
    pub entries: Vec<ReportEntry>,
    pub stats: SamplerStats,
    pub stride: usize,
    pub metadata: VideoMetadata,
}

impl ScanReport {
    pub fn timestamps(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.timestamp).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
