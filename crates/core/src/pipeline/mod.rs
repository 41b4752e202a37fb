pub mod frame_sampler;
pub mod pipeline_logger;
pub mod result_aggregator;
pub mod scan_error;
pub mod scan_request;
pub mod scan_video_use_case;
