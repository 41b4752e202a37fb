use std::path::{Path, PathBuf};

use crate::report::domain::report_sink::{PersistResult, ReportError, ReportSink};
use crate::report::domain::scan_report::ScanReport;

use super::text_report_writer::replace_file;

/// Writes the full report (entries, sampling statistics and video metadata)
/// as pretty-printed JSON.
pub struct JsonReportWriter {
    path: PathBuf,
}

impl JsonReportWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for JsonReportWriter {
    fn finalize(&self, report: &ScanReport) -> Result<PersistResult, ReportError> {
        if report.is_empty() {
            return Ok(PersistResult::NoMatch);
        }
        let mut json = serde_json::to_string_pretty(report)?;
        json.push('\n');
        replace_file(&self.path, json.as_bytes())?;
        log::info!("Wrote JSON report to {}", self.path.display());
        Ok(PersistResult::Persisted {
            path: self.path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::domain::scan_report::ReportEntry;
    use crate::report::infrastructure::text_report_writer::tests::report;

    #[test]
    fn test_json_contains_entries_and_stats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let original = report(&[5.0, 6.0]);
        JsonReportWriter::new(&path).finalize(&original).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let entries: Vec<ReportEntry> =
            serde_json::from_value(value["entries"].clone()).unwrap();
        assert_eq!(entries, original.entries);
        assert_eq!(value["stats"]["frames_sampled"], 10);
        assert_eq!(value["stride"], 30);
        assert_eq!(value["metadata"]["fps"], 30.0);
    }

    #[test]
    fn test_empty_report_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let result = JsonReportWriter::new(&path).finalize(&report(&[])).unwrap();
        assert_eq!(result, PersistResult::NoMatch);
        assert!(!path.exists());
    }
}
