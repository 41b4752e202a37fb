use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::report::domain::report_sink::{PersistResult, ReportError, ReportSink};
use crate::report::domain::scan_report::ScanReport;
use crate::shared::constants::REPORT_HEADER;

/// Writes the plain-text timestamp list:
///
/// ```text
/// Timestamps where the person was detected:
/// 5.00 seconds
/// ```
pub struct TextReportWriter {
    path: PathBuf,
}

impl TextReportWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for TextReportWriter {
    fn finalize(&self, report: &ScanReport) -> Result<PersistResult, ReportError> {
        if report.is_empty() {
            return Ok(PersistResult::NoMatch);
        }
        replace_file(&self.path, render_text(report).as_bytes())?;
        log::info!(
            "Wrote {} timestamp(s) to {}",
            report.len(),
            self.path.display()
        );
        Ok(PersistResult::Persisted {
            path: self.path.clone(),
        })
    }
}

pub fn render_text(report: &ScanReport) -> String {
    let mut out = String::from(REPORT_HEADER);
    out.push('\n');
    for t in report.timestamps() {
        out.push_str(&format!("{t:.2} seconds\n"));
    }
    out
}

/// Writes `contents` to a sibling `.part` file and renames it over `path`,
/// so readers never see a half-written report.
pub(crate) fn replace_file(path: &Path, contents: &[u8]) -> Result<(), ReportError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ReportError::Io { path, source }
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".part");
    let temp_path = path.with_file_name(temp_name);

    let mut file = fs::File::create(&temp_path).map_err(io_err(&temp_path))?;
    file.write_all(contents).map_err(io_err(&temp_path))?;
    file.flush().map_err(io_err(&temp_path))?;
    drop(file);

    fs::rename(&temp_path, path).map_err(io_err(path))
}
