use std::path::{Path, PathBuf};

use crate::pipeline::scan_error::ScanError;

/// The two inputs of a scan, checked to exist before any work starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanRequest {
    video: PathBuf,
    reference: PathBuf,
}

impl ScanRequest {
    pub fn new(video: impl Into<PathBuf>, reference: impl Into<PathBuf>) -> Result<Self, ScanError> {
        Self::from_selection(Some(video.into()), Some(reference.into()))
    }

    /// Builds a request from whatever a host has selected so far.
    pub fn from_selection(
        video: Option<PathBuf>,
        reference: Option<PathBuf>,
    ) -> Result<Self, ScanError> {
        let video = video.ok_or(ScanError::InputMissing("video"))?;
        let reference = reference.ok_or(ScanError::InputMissing("reference image"))?;

        if !video.exists() {
            return Err(ScanError::InputNotFound {
                what: "video",
                path: video,
            });
        }
        if !reference.exists() {
            return Err(ScanError::InputNotFound {
                what: "reference image",
                path: reference,
            });
        }
        Ok(Self { video, reference })
    }

    pub fn video(&self) -> &Path {
        &self.video
    }

    pub fn reference(&self) -> &Path {
        &self.reference
    }
}
