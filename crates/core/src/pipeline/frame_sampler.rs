use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::pipeline::scan_error::ScanError;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

/// A frame picked for analysis, with its position in the video.
#[derive(Clone, Debug)]
pub struct SampledFrame {
    pub index: usize,
    pub timestamp: f64,
    pub frame: Frame,
}

/// Counters kept while a video is being sampled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SamplerStats {
    pub frames_read: usize,
    pub frames_sampled: usize,
    pub decode_failures: usize,
}

/// Frames between two samples: `round(fps × interval)`, never below 1.
/// An unknown frame rate samples every frame.
pub fn stride_for(fps: Option<f64>, sample_interval_secs: f64) -> usize {
    match fps {
        Some(fps) => {
            let stride = (fps * sample_interval_secs).round();
            if stride.is_finite() && stride >= 1.0 {
                stride as usize
            } else {
                1
            }
        }
        None => 1,
    }
}

/// Seconds from the start of the video to frame `index`. Without a frame
/// rate every frame counts as one second.
pub fn timestamp_of(index: usize, fps: Option<f64>) -> f64 {
    match fps {
        Some(fps) => index as f64 / fps,
        None => index as f64,
    }
}

/// Owns an opened video for the duration of one scan and picks every
/// `stride`-th frame from it.
///
/// The reader is closed exactly once, when the sampler is dropped, whether
/// the scan ran to the end, failed, or was cancelled.
pub struct FrameSampler<'r> {
    reader: &'r mut dyn VideoReader,
    metadata: VideoMetadata,
    stride: usize,
    fps: Option<f64>,
    stats: SamplerStats,
    cancelled: bool,
}

impl<'r> FrameSampler<'r> {
    /// Opens `path` with `reader`. On failure nothing has been acquired and
    /// the reader is left untouched.
    pub fn open(
        reader: &'r mut dyn VideoReader,
        path: &Path,
        sample_interval_secs: f64,
    ) -> Result<Self, ScanError> {
        let metadata = reader.open(path).map_err(|source| ScanError::VideoOpen {
            path: path.to_path_buf(),
            source,
        })?;

        let fps = metadata.frame_rate();
        if fps.is_none() {
            log::warn!(
                "{} reports no frame rate; analysing every frame at 1 s per frame",
                path.display()
            );
        }
        let stride = stride_for(fps, sample_interval_secs);

        log::info!(
            "Opened {} ({}x{}, {:.2} fps, {} frames), sampling every {stride} frame(s)",
            path.display(),
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata
                .frame_count()
                .map_or_else(|| "unknown".to_string(), |n| n.to_string()),
        );

        Ok(Self {
            reader,
            metadata,
            stride,
            fps,
            stats: SamplerStats::default(),
            cancelled: false,
        })
    }

    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn stats(&self) -> SamplerStats {
        self.stats
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Lazily reads the video front to back and yields the sampled frames.
    ///
    /// `cancel` is checked before every read. `on_tick` is called with
    /// `(frames_read, total)` after every read, sampled or not, and stops
    /// the sequence by returning `false`. A stop request that arrives once
    /// the container's reported frame count has been read ends the sequence
    /// normally instead of cancelling it. Frames that fail to decode are
    /// logged, counted and skipped. An empty video produces the single tick
    /// `(0, total)`.
    pub fn samples<'s>(
        &'s mut self,
        cancel: &'s AtomicBool,
        on_tick: impl FnMut(usize, Option<usize>) -> bool + 's,
    ) -> Samples<'s> {
        let total = self.metadata.frame_count();
        Samples {
            frames: self.reader.frames(),
            stats: &mut self.stats,
            cancelled: &mut self.cancelled,
            stride: self.stride,
            fps: self.fps,
            total,
            cancel,
            on_tick: Box::new(on_tick),
            done: false,
        }
    }
}

impl Drop for FrameSampler<'_> {
    fn drop(&mut self) {
        self.reader.close();
        log::debug!(
            "Released video after {} frames ({} sampled)",
            self.stats.frames_read,
            self.stats.frames_sampled
        );
    }
}

/// Iterator returned by [`FrameSampler::samples`].
pub struct Samples<'s> {
    frames: Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + 's>,
    stats: &'s mut SamplerStats,
    cancelled: &'s mut bool,
    stride: usize,
    fps: Option<f64>,
    total: Option<usize>,
    cancel: &'s AtomicBool,
    on_tick: Box<dyn FnMut(usize, Option<usize>) -> bool + 's>,
    done: bool,
}

impl Samples<'_> {
    fn fully_read(&self) -> bool {
        self.total == Some(self.stats.frames_read)
    }

    fn stop(&mut self, cancelled: bool) -> Option<SampledFrame> {
        self.done = true;
        if cancelled {
            *self.cancelled = true;
            log::info!("Scan cancelled after {} frames", self.stats.frames_read);
        }
        None
    }
}

impl Iterator for Samples<'_> {
    type Item = SampledFrame;

    fn next(&mut self) -> Option<SampledFrame> {
        while !self.done {
            if self.cancel.load(Ordering::Relaxed) {
                let cancelled = !self.fully_read();
                return self.stop(cancelled);
            }

            let Some(item) = self.frames.next() else {
                if self.stats.frames_read == 0 {
                    (self.on_tick)(0, self.total);
                }
                return self.stop(false);
            };

            let index = self.stats.frames_read;
            self.stats.frames_read += 1;

            let sample = match item {
                Ok(frame) if index % self.stride == 0 => {
                    self.stats.frames_sampled += 1;
                    Some(SampledFrame {
                        index,
                        timestamp: timestamp_of(index, self.fps),
                        frame,
                    })
                }
                Ok(_) => None,
                Err(source) => {
                    let err = ScanError::FrameDecode { index, source };
                    log::warn!("Skipping frame: {err}");
                    self.stats.decode_failures += 1;
                    None
                }
            };

            if !(self.on_tick)(index + 1, self.total) {
                if !self.fully_read() {
                    return self.stop(true);
                }
                self.done = true;
            }
            if sample.is_some() {
                return sample;
            }
        }
        None
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};

    /// In-memory video. Frames listed in `corrupt` come back as decode errors.
    pub(crate) struct StubVideo {
        pub frames: Vec<Frame>,
        pub fps: f64,
        pub total_frames: usize,
        pub corrupt: Vec<usize>,
        pub fail_open: bool,
        pub opened: Arc<AtomicUsize>,
        pub closed: Arc<AtomicUsize>,
    }

    impl StubVideo {
        pub(crate) fn new(frames: Vec<Frame>, fps: f64) -> Self {
            let total_frames = frames.len();
            Self {
                frames,
                fps,
                total_frames,
                corrupt: Vec::new(),
                fail_open: false,
                opened: Arc::new(AtomicUsize::new(0)),
                closed: Arc::new(AtomicUsize::new(0)),
            }
        }

        /// `count` tiny frames, each filled with `pixel(index)`.
        pub(crate) fn uniform(count: usize, fps: f64, pixel: impl Fn(usize) -> [u8; 3]) -> Self {
            let frames = (0..count)
                .map(|i| Frame::new(pixel(i).repeat(16), 4, 4, 3, i))
                .collect();
            Self::new(frames, fps)
        }
    }

    impl VideoReader for StubVideo {
        fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            if self.fail_open {
                return Err("unsupported container".into());
            }
            Ok(VideoMetadata {
                width: 4,
                height: 4,
                fps: self.fps,
                total_frames: self.total_frames,
                codec: "stub".into(),
                source_path: Some(path.to_path_buf()),
            })
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            let corrupt = self.corrupt.clone();
            Box::new(self.frames.iter().cloned().map(move |f| {
                if corrupt.contains(&f.index()) {
                    Err(format!("corrupt packet at {}", f.index()).into())
                } else {
                    Ok(f)
                }
            }))
        }

        fn close(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn collect_indices(video: &mut StubVideo, interval: f64) -> (Vec<usize>, SamplerStats) {
        let cancel = AtomicBool::new(false);
        let mut sampler = FrameSampler::open(video, Path::new("clip.mp4"), interval).unwrap();
        let indices = sampler.samples(&cancel, |_, _| true).map(|s| s.index).collect();
        (indices, sampler.stats())
    }

    #[test]
    fn test_one_sample_per_second() {
        // 10 s at 30 fps
        let mut video = StubVideo::uniform(300, 30.0, |_| [0, 0, 0]);
        let (indices, stats) = collect_indices(&mut video, 1.0);
        assert_eq!(indices, (0..10).map(|s| s * 30).collect::<Vec<_>>());
        assert_eq!(stats.frames_read, 300);
        assert_eq!(stats.frames_sampled, 10);
    }

    #[test]
    fn test_partial_last_second_is_sampled() {
        // 2.5 s at 10 fps → samples at 0, 1, 2 s
        let mut video = StubVideo::uniform(25, 10.0, |_| [0, 0, 0]);
        let (indices, _) = collect_indices(&mut video, 1.0);
        assert_eq!(indices, vec![0, 10, 20]);
    }

    #[test]
    fn test_timestamps_follow_frame_rate() {
        let mut video = StubVideo::uniform(100, 25.0, |_| [0, 0, 0]);
        let cancel = AtomicBool::new(false);
        let mut sampler = FrameSampler::open(&mut video, Path::new("a.mp4"), 1.0).unwrap();
        let ts: Vec<f64> = sampler.samples(&cancel, |_, _| true).map(|s| s.timestamp).collect();
        assert_eq!(ts, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[rstest::rstest]
    #[case::integral(30.0, 1.0, 30)]
    #[case::ntsc(29.97, 1.0, 30)]
    #[case::half_second(24.0, 0.5, 12)]
    #[case::slow_video(0.5, 1.0, 1)]
    fn test_stride_rounding(#[case] fps: f64, #[case] interval: f64, #[case] expected: usize) {
        assert_eq!(stride_for(Some(fps), interval), expected);
    }

    #[test]
    fn test_unknown_fps_samples_every_frame() {
        let mut video = StubVideo::uniform(4, 0.0, |_| [0, 0, 0]);
        let cancel = AtomicBool::new(false);
        let mut sampler = FrameSampler::open(&mut video, Path::new("a.mp4"), 1.0).unwrap();
        assert_eq!(sampler.stride(), 1);
        let ts: Vec<f64> = sampler.samples(&cancel, |_, _| true).map(|s| s.timestamp).collect();
        assert_eq!(ts, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_progress_ticks_every_frame() {
        let mut video = StubVideo::uniform(5, 2.0, |_| [0, 0, 0]);
        let cancel = AtomicBool::new(false);
        let ticks = Mutex::new(Vec::new());
        let mut sampler = FrameSampler::open(&mut video, Path::new("a.mp4"), 1.0).unwrap();
        let count = sampler
            .samples(&cancel, |cur, total| {
                ticks.lock().unwrap().push((cur, total));
                true
            })
            .count();
        assert_eq!(count, 3);
        let expected: Vec<_> = (1..=5).map(|i| (i, Some(5))).collect();
        assert_eq!(*ticks.lock().unwrap(), expected);
    }

    #[test]
    fn test_unknown_total_gives_indeterminate_ticks() {
        let mut video = StubVideo::uniform(3, 1.0, |_| [0, 0, 0]);
        video.total_frames = 0;
        let cancel = AtomicBool::new(false);
        let ticks = Mutex::new(Vec::new());
        let mut sampler = FrameSampler::open(&mut video, Path::new("a.mp4"), 1.0).unwrap();
        sampler
            .samples(&cancel, |cur, total| {
                ticks.lock().unwrap().push((cur, total));
                true
            })
            .for_each(drop);
        assert_eq!(*ticks.lock().unwrap(), vec![(1, None), (2, None), (3, None)]);
    }

    #[test]
    fn test_empty_video_emits_terminal_tick() {
        let mut video = StubVideo::new(Vec::new(), 30.0);
        let cancel = AtomicBool::new(false);
        let ticks = Mutex::new(Vec::new());
        let mut sampler = FrameSampler::open(&mut video, Path::new("a.mp4"), 1.0).unwrap();
        let count = sampler
            .samples(&cancel, |cur, total| {
                ticks.lock().unwrap().push((cur, total));
                true
            })
            .count();
        assert_eq!(count, 0);
        assert_eq!(*ticks.lock().unwrap(), vec![(0, None)]);
    }

    #[test]
    fn test_corrupt_frames_are_skipped_and_counted() {
        let mut video = StubVideo::uniform(6, 2.0, |_| [0, 0, 0]);
        video.corrupt = vec![2, 3];
        let (indices, stats) = collect_indices(&mut video, 1.0);
        // Frame 2 would have been sampled; the index grid is unaffected.
        assert_eq!(indices, vec![0, 4]);
        assert_eq!(stats.decode_failures, 2);
        assert_eq!(stats.frames_read, 6);
    }

    #[test]
    fn test_reader_closed_once_on_exhaustion() {
        let mut video = StubVideo::uniform(10, 5.0, |_| [0, 0, 0]);
        let closed = Arc::clone(&video.closed);
        collect_indices(&mut video, 1.0);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reader_closed_once_when_abandoned_early() {
        let mut video = StubVideo::uniform(10, 1.0, |_| [0, 0, 0]);
        let closed = Arc::clone(&video.closed);
        {
            let cancel = AtomicBool::new(false);
            let mut sampler = FrameSampler::open(&mut video, Path::new("a.mp4"), 1.0).unwrap();
            let first = sampler.samples(&cancel, |_, _| true).next();
            assert!(first.is_some());
            assert_eq!(closed.load(Ordering::SeqCst), 0);
        }
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_open_failure_acquires_nothing() {
        let mut video = StubVideo::uniform(3, 1.0, |_| [0, 0, 0]);
        video.fail_open = true;
        let closed = Arc::clone(&video.closed);
        let err = FrameSampler::open(&mut video, Path::new("bad.mkv"), 1.0).err().unwrap();
        assert!(matches!(err, ScanError::VideoOpen { .. }));
        assert_eq!(closed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancel_flag_stops_before_next_read() {
        let mut video = StubVideo::uniform(20, 1.0, |_| [0, 0, 0]);
        let cancel = AtomicBool::new(false);
        let mut sampler = FrameSampler::open(&mut video, Path::new("a.mp4"), 1.0).unwrap();
        let mut seen = 0;
        for _ in sampler.samples(&cancel, |_, _| true) {
            seen += 1;
            if seen == 3 {
                cancel.store(true, Ordering::Relaxed);
            }
        }
        assert_eq!(seen, 3);
        assert!(sampler.is_cancelled());
        assert_eq!(sampler.stats().frames_read, 3);
    }

    #[test]
    fn test_tick_returning_false_cancels() {
        let mut video = StubVideo::uniform(20, 1.0, |_| [0, 0, 0]);
        let cancel = AtomicBool::new(false);
        let mut sampler = FrameSampler::open(&mut video, Path::new("a.mp4"), 1.0).unwrap();
        let seen = sampler.samples(&cancel, |cur, _| cur < 5).count();
        assert_eq!(seen, 4);
        assert!(sampler.is_cancelled());
    }

    #[test]
    fn test_stop_on_last_frame_completes_normally() {
        let mut video = StubVideo::uniform(5, 1.0, |_| [0, 0, 0]);
        let cancel = AtomicBool::new(false);
        let mut sampler = FrameSampler::open(&mut video, Path::new("a.mp4"), 1.0).unwrap();
        let indices: Vec<usize> = sampler
            .samples(&cancel, |cur, total| Some(cur) != total)
            .map(|s| s.index)
            .collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert!(!sampler.is_cancelled());
        assert_eq!(sampler.stats().frames_read, 5);
    }

    #[test]
    fn test_cancel_flag_after_last_frame_completes_normally() {
        let mut video = StubVideo::uniform(3, 1.0, |_| [0, 0, 0]);
        let cancel = AtomicBool::new(false);
        let mut sampler = FrameSampler::open(&mut video, Path::new("a.mp4"), 1.0).unwrap();
        let mut seen = 0;
        for _ in sampler.samples(&cancel, |_, _| true) {
            seen += 1;
            if seen == 3 {
                cancel.store(true, Ordering::Relaxed);
            }
        }
        assert_eq!(seen, 3);
        assert!(!sampler.is_cancelled());
    }

    #[test]
    fn test_stop_with_unknown_total_cancels() {
        let mut video = StubVideo::uniform(3, 1.0, |_| [0, 0, 0]);
        video.total_frames = 0;
        let cancel = AtomicBool::new(false);
        let mut sampler = FrameSampler::open(&mut video, Path::new("a.mp4"), 1.0).unwrap();
        let seen = sampler.samples(&cancel, |cur, _| cur < 3).count();
        assert_eq!(seen, 2);
        assert!(sampler.is_cancelled());
    }

    #[test]
    fn test_exhaustion_is_not_cancellation() {
        let mut video = StubVideo::uniform(3, 1.0, |_| [0, 0, 0]);
        let cancel = AtomicBool::new(false);
        let mut sampler = FrameSampler::open(&mut video, Path::new("a.mp4"), 1.0).unwrap();
        sampler.samples(&cancel, |_, _| true).for_each(drop);
        assert!(!sampler.is_cancelled());
    }
}
