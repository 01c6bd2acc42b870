pub mod artifact;
pub mod ffmpeg;
pub mod pipeline;

pub use ffmpeg::FfmpegToolkit;
pub use pipeline::Pipeline;
