//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the media and uploader
//! traits plus an observer that records notifications, allowing complete
//! pipeline runs without ffmpeg or network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use spoilr_core::testing::{MockMedia, MockUploader, RecordingObserver};
//!
//! let media = MockMedia::new();
//! let fastpic = MockUploader::new(Destination::Fastpic);
//! let observer = Arc::new(RecordingObserver::new());
//!
//! // Configure mock behavior
//! media.fail_screenshot(2).await;
//! fastpic.set_album("https://fastpic.example/album/1").await;
//!
//! // Build a PipelineProcessor with them...
//! ```

mod mock_media;
mod mock_uploader;
mod recording_observer;

pub use mock_media::{ContactSheetBehavior, MockMedia};
pub use mock_uploader::MockUploader;
pub use recording_observer::RecordingObserver;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::collections::BTreeMap;
    use std::path::Path;

    use crate::config::Settings;
    use crate::item::{Item, ProcessingState};
    use crate::media::{apply_media_info, MediaInfo};

    fn section(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Probe output of a 1080p H.264 + AAC stereo video.
    pub fn video_info(duration_secs: f64) -> MediaInfo {
        let duration = format!("{:.3}", duration_secs);
        MediaInfo {
            general: section(&[
                ("duration", duration.as_str()),
                ("bit_rate", "5000000"),
                ("format_name", "matroska,webm"),
            ]),
            video: section(&[
                ("codec_name", "h264"),
                ("width", "1920"),
                ("height", "1080"),
                ("r_frame_rate", "24000/1001"),
                ("fps_decimal", "23.976"),
            ]),
            audio: section(&[
                ("codec_name", "aac"),
                ("sample_rate", "48000"),
                ("channels", "2"),
                ("bit_rate", "192000"),
            ]),
        }
    }

    /// A probed, pending item for `path`.
    pub fn pending_item(id: &str, path: impl AsRef<Path>, duration_secs: f64) -> Item {
        let mut item = Item::new(id, path.as_ref());
        apply_media_info(&mut item, &video_info(duration_secs));
        item.state = ProcessingState::Pending;
        item
    }

    /// Settings with small pools and `screenshot_count` screenshots.
    pub fn settings(screenshot_count: u32) -> Settings {
        Settings {
            screenshot_count,
            max_concurrent_generation: 2,
            max_concurrent_uploads: 2,
            ..Settings::default()
        }
    }
}
