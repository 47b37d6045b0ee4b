//! Processor module for the media processing pipeline.
//!
//! This module provides the `PipelineProcessor` which coordinates:
//! - Ingest: expanding paths, registering and probing items
//! - Generation: contact sheets and screenshots, bounded by the generation pool
//! - Upload: fan-out of every artifact to every required destination,
//!   bounded by the upload pool
//!
//! A run processes all pending items concurrently. Results flow back through
//! the item registry only; cancelling a run resets unfinished items to
//! `Pending`.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use spoilr_core::config::Config;
//! use spoilr_core::media::FfmpegMedia;
//! use spoilr_core::observer::NoopObserver;
//! use spoilr_core::processor::{PipelineProcessor, RunConfig};
//! use spoilr_core::uploader::UploaderSet;
//!
//! let config = Config::default();
//! let processor = PipelineProcessor::new(
//!     &config.settings,
//!     FfmpegMedia::new(config.tools.clone()),
//!     UploaderSet::http(),
//!     Arc::new(NoopObserver),
//! );
//!
//! processor.add_files(&["/videos".into()]).await?;
//! processor.run(RunConfig::from_config(&config)).await?;
//!
//! let report = processor.render_report(&config.templates.current_template()).await;
//! println!("{}", report);
//! ```

mod archive;
mod generation;
mod ingest;
mod pipeline;
mod pool;
mod run;
mod types;
mod upload;

pub use archive::sanitize_file_name;
pub use generation::screenshot_timestamps;
pub use ingest::expand_paths;
pub use pipeline::PipelineProcessor;
pub use pool::{Cancelled, PoolPermit, ResourcePool};
pub use types::{
    AddSummary, GeneratedMedia, PipelineStatus, PoolStatus, RunConfig, RunError, StageError,
};
