//! Types for the media module.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Raw attributes reported by the prober, grouped by section.
///
/// Keys follow ffprobe naming (`duration`, `bit_rate`, `codec_name`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub general: BTreeMap<String, String>,
    pub video: BTreeMap<String, String>,
    pub audio: BTreeMap<String, String>,
}

impl MediaInfo {
    /// Container duration in seconds, if reported.
    pub fn duration_secs(&self) -> Option<f64> {
        self.general.get("duration").and_then(|d| d.parse().ok())
    }
}

/// A single screenshot to extract.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenshotJob {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// Seek position in seconds.
    pub timestamp_secs: f64,
    /// JPEG quality scale (1 best .. 31 worst).
    pub quality: u8,
}

/// A contact sheet to render into a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSheetJob {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    /// Extra arguments passed to the contact-sheet tool.
    pub args: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_secs() {
        let mut info = MediaInfo::default();
        assert_eq!(info.duration_secs(), None);
        info.general.insert("duration".into(), "30.5".into());
        assert_eq!(info.duration_secs(), Some(30.5));
    }
}
