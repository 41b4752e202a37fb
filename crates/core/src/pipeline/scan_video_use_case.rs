use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::pipeline::frame_sampler::FrameSampler;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::result_aggregator::{DetectionHit, ResultAggregator};
use crate::pipeline::scan_error::ScanError;
use crate::pipeline::scan_request::ScanRequest;
use crate::recognition::domain::face_analyzer::FaceAnalyzer;
use crate::recognition::domain::face_matcher::{DistanceMetric, FaceMatcher};
use crate::recognition::domain::identity_encoder::encode_reference;
use crate::report::domain::report_sink::{PersistResult, ReportSink};
use crate::report::domain::scan_report::ScanReport;
use crate::shared::constants::{DEFAULT_MATCH_THRESHOLD, DEFAULT_SAMPLE_INTERVAL_SECS};
use crate::video::domain::video_reader::VideoReader;

/// Called with `(frames_read, total)` after every frame; returning `false`
/// cancels the scan unless the last reported frame has already been read.
pub type ProgressCallback = Box<dyn Fn(usize, Option<usize>) -> bool + Send>;

/// Called once per accepted match.
pub type HitCallback = Box<dyn Fn(&DetectionHit) + Send>;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScanConfig {
    pub threshold: f64,
    pub metric: DistanceMetric,
    pub sample_interval_secs: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
            metric: DistanceMetric::default(),
            sample_interval_secs: DEFAULT_SAMPLE_INTERVAL_SECS,
        }
    }
}

#[derive(Debug)]
pub enum ScanOutcome {
    /// The person was seen; the report was persisted at `report_path`.
    Found {
        report: ScanReport,
        report_path: PathBuf,
    },
    /// The whole video was scanned without a match. Nothing was persisted.
    NoMatch { report: ScanReport },
    /// The scan was stopped before the end of the video. Nothing was
    /// persisted.
    Cancelled { frames_read: usize },
}

/// Scans a video for the person shown in a reference photo.
///
/// The reference is encoded first, so a photo without a face fails before
/// the video is touched. The video is then sampled front to back; each
/// sampled frame is analysed and every face closer to the reference than the
/// threshold becomes a hit. The report sink runs once, at the end, unless the
/// scan was cancelled.
pub struct ScanVideoUseCase {
    image_reader: Box<dyn VideoReader>,
    video_reader: Box<dyn VideoReader>,
    analyzer: FaceAnalyzer,
    sink: Box<dyn ReportSink>,
    config: ScanConfig,
    logger: Box<dyn PipelineLogger>,
    on_progress: Option<ProgressCallback>,
    on_hit: Option<HitCallback>,
    cancelled: Arc<AtomicBool>,
}

impl ScanVideoUseCase {
    pub fn new(
        image_reader: Box<dyn VideoReader>,
        video_reader: Box<dyn VideoReader>,
        analyzer: FaceAnalyzer,
        sink: Box<dyn ReportSink>,
        config: ScanConfig,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            image_reader,
            video_reader,
            analyzer,
            sink,
            config,
            logger,
            on_progress: None,
            on_hit: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn with_hit_handler(mut self, on_hit: HitCallback) -> Self {
        self.on_hit = Some(on_hit);
        self
    }

    /// Flag that stops the scan before the next frame is read once set.
    /// Each call to [`execute`](Self::execute) starts with it cleared.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn execute(&mut self, request: &ScanRequest) -> Result<ScanOutcome, ScanError> {
        let Self {
            image_reader,
            video_reader,
            analyzer,
            sink,
            config,
            logger,
            on_progress,
            on_hit,
            cancelled,
        } = self;
        cancelled.store(false, Ordering::SeqCst);

        logger.info(&format!(
            "Encoding reference face from {}",
            request.reference().display()
        ));
        let reference = encode_reference(analyzer, image_reader.as_mut(), request.reference())?;

        let matcher = FaceMatcher::new(config.threshold, config.metric);
        let mut aggregator = ResultAggregator::new();

        let (stats, stride, metadata, was_cancelled) = {
            let mut sampler = FrameSampler::open(
                video_reader.as_mut(),
                request.video(),
                config.sample_interval_secs,
            )?;
            let total = sampler.metadata().frame_count();
            let progress = on_progress.as_deref();
            let mut samples = sampler.samples(&**cancelled, |current, total| {
                progress.map_or(true, |cb| cb(current, total))
            });

            loop {
                let t0 = Instant::now();
                let Some(sample) = samples.next() else {
                    break;
                };
                logger.timing("decode", t0.elapsed().as_secs_f64() * 1000.0);
                logger.progress(sample.index + 1, total);

                let t0 = Instant::now();
                let faces = analyzer
                    .analyze(&sample.frame)
                    .map_err(|source| ScanError::Analysis {
                        index: sample.index,
                        source,
                    })?;
                logger.timing("detect", t0.elapsed().as_secs_f64() * 1000.0);
                logger.metric("faces", faces.len() as f64);

                let t0 = Instant::now();
                for (region, embedding) in &faces {
                    let result = matcher.compare(*region, embedding, &reference);
                    log::debug!(
                        "Frame {} ({:.2}s): face distance {:.3}",
                        sample.index,
                        sample.timestamp,
                        result.distance
                    );
                    if !result.is_match {
                        continue;
                    }
                    let hit = aggregator.on_match(&sample, &result.region, result.distance);
                    logger.hit(hit.timestamp, hit.distance);
                    if let Some(cb) = on_hit.as_deref() {
                        cb(&hit);
                    }
                }
                logger.timing("match", t0.elapsed().as_secs_f64() * 1000.0);
            }
            drop(samples);

            let stats = sampler.stats();
            logger.progress(stats.frames_read, total);
            (
                stats,
                sampler.stride(),
                sampler.metadata().clone(),
                sampler.is_cancelled(),
            )
        };

        if was_cancelled {
            logger.info(&format!(
                "Scan cancelled after {} frames; nothing saved",
                stats.frames_read
            ));
            return Ok(ScanOutcome::Cancelled {
                frames_read: stats.frames_read,
            });
        }

        if stats.decode_failures > 0 {
            log::warn!("{} frame(s) could not be decoded", stats.decode_failures);
        }

        let report = ScanReport {
            entries: aggregator.into_entries(),
            stats,
            stride,
            metadata,
        };
        logger.summary();

        match sink.finalize(&report)? {
            PersistResult::Persisted { path } => {
                logger.info(&format!("Person found at {} moment(s)", report.len()));
                Ok(ScanOutcome::Found {
                    report,
                    report_path: path,
                })
            }
            PersistResult::NoMatch => {
                logger.info("Person not found in video");
                Ok(ScanOutcome::NoMatch { report })
            }
        }
    }
}
