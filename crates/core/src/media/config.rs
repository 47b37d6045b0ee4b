//! Configuration for the external media tools.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Locations of the external binaries used for probing and generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaToolsConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to ffprobe binary.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// Path to the mtn (movie thumbnailer) binary used for contact sheets.
    #[serde(default = "default_mtn_path")]
    pub mtn_path: PathBuf,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_mtn_path() -> PathBuf {
    PathBuf::from("mtn")
}

impl Default for MediaToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            mtn_path: default_mtn_path(),
        }
    }
}
