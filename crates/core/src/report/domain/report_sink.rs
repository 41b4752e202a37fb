use std::path::PathBuf;

use thiserror::Error;

use crate::report::domain::scan_report::ScanReport;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to write report to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// What a sink did with a finished report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PersistResult {
    Persisted { path: PathBuf },
    /// Nothing matched, so nothing was written.
    NoMatch,
}

/// Persists a finished report.
///
/// An empty report must not produce an artifact. A non-empty one replaces
/// whatever a previous scan left at the same location.
pub trait ReportSink: Send {
    fn finalize(&self, report: &ScanReport) -> Result<PersistResult, ReportError>;
}
