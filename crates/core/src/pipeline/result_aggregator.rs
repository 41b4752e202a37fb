use crate::pipeline::frame_sampler::SampledFrame;
use crate::report::domain::scan_report::ReportEntry;
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

/// One accepted match: when it happened and what the face looked like.
#[derive(Clone, Debug)]
pub struct DetectionHit {
    pub timestamp: f64,
    pub frame_index: usize,
    pub distance: f64,
    /// Tight RGB crop of the matched face.
    pub crop: Frame,
}

impl DetectionHit {
    pub fn entry(&self) -> ReportEntry {
        ReportEntry {
            timestamp: self.timestamp,
            frame_index: self.frame_index,
            distance: self.distance,
        }
    }
}

/// Collects hits in the order samples arrive, which is chronological since
/// the sampler reads front to back.
#[derive(Default)]
pub struct ResultAggregator {
    entries: Vec<ReportEntry>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a match in `sample` and returns the hit for the caller to
    /// forward to observers.
    pub fn on_match(&mut self, sample: &SampledFrame, region: &FaceRegion, distance: f64) -> DetectionHit {
        let crop = sample.frame.crop(region).to_rgb().into_owned();
        let hit = DetectionHit {
            timestamp: sample.timestamp,
            frame_index: sample.index,
            distance,
            crop,
        };
        self.entries.push(hit.entry());
        hit
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<ReportEntry> {
        self.entries
    }
}
