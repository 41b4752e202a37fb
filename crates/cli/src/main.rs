use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicUsize, Ordering};

use clap::Parser;

use person_scan_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use person_scan_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use person_scan_core::pipeline::result_aggregator::DetectionHit;
use person_scan_core::pipeline::scan_request::ScanRequest;
use person_scan_core::pipeline::scan_video_use_case::{
    HitCallback, ProgressCallback, ScanConfig, ScanOutcome, ScanVideoUseCase,
};
use person_scan_core::recognition::domain::face_analyzer::FaceAnalyzer;
use person_scan_core::recognition::domain::face_matcher::DistanceMetric;
use person_scan_core::recognition::infrastructure::onnx_arcface_encoder::OnnxArcFaceEncoder;
use person_scan_core::report::domain::report_sink::ReportSink;
use person_scan_core::report::infrastructure::json_report_writer::JsonReportWriter;
use person_scan_core::report::infrastructure::text_report_writer::TextReportWriter;
use person_scan_core::shared::constants::{
    DEFAULT_DETECTION_CONFIDENCE, DEFAULT_MATCH_THRESHOLD, DEFAULT_REPORT_FILENAME,
    DEFAULT_SAMPLE_INTERVAL_SECS, EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL, IMAGE_EXTENSIONS,
    THUMBNAIL_SIZE, YOLO_MODEL_NAME, YOLO_MODEL_URL,
};
use person_scan_core::shared::model_resolver;
use person_scan_core::video::domain::image_writer::ImageWriter;
use person_scan_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use person_scan_core::video::infrastructure::image_file_reader::ImageFileReader;
use person_scan_core::video::infrastructure::image_file_writer::ImageFileWriter;

/// Find the moments a person appears in a video, given one photo of them.
#[derive(Parser)]
#[command(name = "person-scan")]
struct Cli {
    /// Video to scan.
    video: PathBuf,

    /// Photo of the person to look for.
    reference: PathBuf,

    /// Where to write the list of timestamps.
    #[arg(long, default_value = DEFAULT_REPORT_FILENAME)]
    report: PathBuf,

    /// Report format: text or json.
    #[arg(long, default_value = "text")]
    format: String,

    /// Faces closer to the reference than this distance are a match.
    #[arg(long, default_value_t = DEFAULT_MATCH_THRESHOLD)]
    threshold: f64,

    /// Distance metric: cosine or euclidean.
    #[arg(long, default_value = "cosine")]
    metric: String,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_DETECTION_CONFIDENCE)]
    confidence: f64,

    /// Seconds of video between analysed frames.
    #[arg(long, default_value_t = DEFAULT_SAMPLE_INTERVAL_SECS)]
    sample_interval: f64,

    /// Save a thumbnail of every matched face to this directory.
    #[arg(long)]
    thumbnails: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let request = ScanRequest::new(&cli.video, &cli.reference)?;
    let analyzer = build_analyzer(cli.confidence)?;
    let config = ScanConfig {
        threshold: cli.threshold,
        metric: parse_metric(&cli.metric),
        sample_interval_secs: cli.sample_interval,
    };

    let progress: ProgressCallback = Box::new(|current, total| {
        match total {
            Some(total) => eprint!("\rScanning frame {current}/{total}"),
            None => eprint!("\rScanning frame {current}"),
        }
        true
    });

    let mut use_case = ScanVideoUseCase::new(
        Box::new(ImageFileReader::new()),
        Box::new(FfmpegReader::new()),
        analyzer,
        build_sink(&cli.format, &cli.report),
        config,
        Box::new(StdoutPipelineLogger::default()),
    )
    .with_progress(progress);
    if let Some(dir) = cli.thumbnails.clone() {
        use_case = use_case.with_hit_handler(thumbnail_saver(dir));
    }

    let outcome = use_case.execute(&request)?;
    eprintln!();

    match outcome {
        ScanOutcome::Found {
            report,
            report_path,
        } => {
            println!("Person detected at:");
            for t in report.timestamps() {
                println!("  {t:.2} seconds");
            }
            log::info!("Timestamps saved to {}", report_path.display());
        }
        ScanOutcome::NoMatch { report } => {
            println!(
                "Person not found ({} frames analysed).",
                report.stats.frames_sampled
            );
        }
        ScanOutcome::Cancelled { frames_read } => {
            println!("Scan cancelled after {frames_read} frames.");
        }
    }
    Ok(())
}

fn build_analyzer(confidence: f64) -> Result<FaceAnalyzer, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {YOLO_MODEL_NAME}");
    let detector_path = model_resolver::resolve(
        YOLO_MODEL_NAME,
        YOLO_MODEL_URL,
        None,
        Some(Box::new(|d: u64, t: u64| download_progress("face detection", d, t))),
    )?;
    log::info!("Resolving model: {EMBEDDING_MODEL_NAME}");
    let encoder_path = model_resolver::resolve(
        EMBEDDING_MODEL_NAME,
        EMBEDDING_MODEL_URL,
        None,
        Some(Box::new(|d: u64, t: u64| download_progress("face recognition", d, t))),
    )?;

    let detector = OnnxYoloDetector::new(&detector_path, confidence)?;
    let encoder = OnnxArcFaceEncoder::new(&encoder_path)?;
    Ok(FaceAnalyzer::new(Box::new(detector), Box::new(encoder)))
}

fn build_sink(format: &str, path: &Path) -> Box<dyn ReportSink> {
    if format == "json" {
        Box::new(JsonReportWriter::new(path))
    } else {
        Box::new(TextReportWriter::new(path))
    }
}

fn thumbnail_saver(dir: PathBuf) -> HitCallback {
    let writer = ImageFileWriter::new();
    let count = AtomicUsize::new(0);
    Box::new(move |hit: &DetectionHit| {
        let n = count.fetch_add(1, Ordering::Relaxed) + 1;
        let path = dir.join(thumbnail_name(hit.timestamp, n));
        if let Err(e) = writer.write(&path, &hit.crop, Some(THUMBNAIL_SIZE)) {
            log::warn!("Could not save thumbnail {}: {e}", path.display());
        }
    })
}

fn thumbnail_name(timestamp: f64, n: usize) -> String {
    format!("{timestamp:.2}s_{n}.jpg")
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !is_image(&cli.reference) {
        return Err(format!(
            "Reference must be an image ({}), got {}",
            IMAGE_EXTENSIONS.join(", "),
            cli.reference.display()
        )
        .into());
    }
    if !(cli.threshold > 0.0) {
        return Err(format!("Threshold must be positive, got {}", cli.threshold).into());
    }
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if !(cli.sample_interval > 0.0) {
        return Err(format!(
            "Sample interval must be positive, got {}",
            cli.sample_interval
        )
        .into());
    }
    if cli.format != "text" && cli.format != "json" {
        return Err(format!("Format must be 'text' or 'json', got '{}'", cli.format).into());
    }
    if cli.metric != "cosine" && cli.metric != "euclidean" {
        return Err(format!(
            "Metric must be 'cosine' or 'euclidean', got '{}'",
            cli.metric
        )
        .into());
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn parse_metric(metric: &str) -> DistanceMetric {
    if metric == "euclidean" {
        DistanceMetric::Euclidean
    } else {
        DistanceMetric::Cosine
    }
}

fn download_progress(what: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {what} model... {pct}%");
    } else {
        eprint!("\rDownloading {what} model... {downloaded} bytes");
    }
    if total > 0 && downloaded >= total {
        eprintln!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["person-scan"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["clip.mp4", "me.jpg"]);
        assert_eq!(cli.report, PathBuf::from("detection_timestamps.txt"));
        assert_eq!(cli.threshold, 0.6);
        assert_eq!(cli.confidence, 0.5);
        assert_eq!(cli.sample_interval, 1.0);
        assert_eq!(cli.format, "text");
        assert!(validate(&cli).is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        for args in [
            &["clip.mp4", "me.mp4"][..],
            &["clip.mp4", "me.jpg", "--threshold", "0"],
            &["clip.mp4", "me.jpg", "--confidence", "1.5"],
            &["clip.mp4", "me.jpg", "--sample-interval", "0"],
            &["clip.mp4", "me.jpg", "--format", "csv"],
            &["clip.mp4", "me.jpg", "--metric", "manhattan"],
        ] {
            assert!(validate(&parse(args)).is_err(), "accepted {args:?}");
        }
    }

    #[test]
    fn test_image_extension_is_case_insensitive() {
        assert!(is_image(Path::new("Me.JPG")));
        assert!(!is_image(Path::new("clip.mov")));
    }

    #[test]
    fn test_thumbnail_name() {
        assert_eq!(thumbnail_name(5.0, 1), "5.00s_1.jpg");
        assert_eq!(thumbnail_name(12.345678, 3), "12.35s_3.jpg");
    }

    #[test]
    fn test_parse_metric() {
        assert_eq!(parse_metric("euclidean"), DistanceMetric::Euclidean);
        assert_eq!(parse_metric("cosine"), DistanceMetric::Cosine);
    }
}
