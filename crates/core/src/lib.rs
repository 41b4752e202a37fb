pub mod detection;
pub mod pipeline;
pub mod recognition;
pub mod report;
pub mod shared;
pub mod video;
