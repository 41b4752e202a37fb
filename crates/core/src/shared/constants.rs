pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "w600k_r50.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/w600k_r50.onnx";

/// Candidate faces match the reference only when their distance is
/// strictly below this value.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.6;

/// Minimum detector confidence for a face to be considered at all.
pub const DEFAULT_DETECTION_CONFIDENCE: f64 = 0.5;

/// Seconds of footage between two analysed frames.
pub const DEFAULT_SAMPLE_INTERVAL_SECS: f64 = 1.0;

pub const DEFAULT_REPORT_FILENAME: &str = "detection_timestamps.txt";

pub const REPORT_HEADER: &str = "Timestamps where the person was detected:";

/// Longest edge of the hit thumbnails written by hosts.
pub const THUMBNAIL_SIZE: u32 = 100;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
