//! Media probing and image generation.
//!
//! [`MediaProber`] reports attributes of a file, [`MediaGenerator`] renders
//! contact sheets and screenshots from it. [`FfmpegMedia`] implements both on
//! top of ffprobe, ffmpeg and mtn; tests use the mocks in `crate::testing`.

mod config;
mod error;
mod ffmpeg;
pub mod format;
mod traits;
mod types;

pub use config::MediaToolsConfig;
pub use error::MediaError;
pub use ffmpeg::FfmpegMedia;
pub use format::{apply_media_info, split_tool_args};
pub use traits::{MediaGenerator, MediaProber};
pub use types::{ContactSheetJob, MediaInfo, ScreenshotJob};
