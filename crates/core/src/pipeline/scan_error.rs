use std::path::PathBuf;

use thiserror::Error;

use crate::report::domain::report_sink::ReportError;

/// Why a scan could not produce a report.
///
/// Cancellation is not an error; it is reported through
/// [`ScanOutcome::Cancelled`](crate::pipeline::scan_video_use_case::ScanOutcome).
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("no {0} selected")]
    InputMissing(&'static str),
    #[error("{what} not found: {}", path.display())]
    InputNotFound { what: &'static str, path: PathBuf },
    #[error("cannot read reference image {}: {source}", path.display())]
    ReferenceUnreadable {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error>,
    },
    #[error("no face found in reference image {}", path.display())]
    NoFaceFound { path: PathBuf },
    #[error("cannot open video {}: {source}", path.display())]
    VideoOpen {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error>,
    },
    #[error("failed to decode frame {index}: {source}")]
    FrameDecode {
        index: usize,
        #[source]
        source: Box<dyn std::error::Error>,
    },
    #[error("face analysis failed on frame {index}: {source}")]
    Analysis {
        index: usize,
        #[source]
        source: Box<dyn std::error::Error>,
    },
    #[error(transparent)]
    Report(#[from] ReportError),
}
