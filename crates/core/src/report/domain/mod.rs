pub mod report_sink;
pub mod scan_report;
