//! ffprobe/ffmpeg/mtn backed media implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::config::MediaToolsConfig;
use super::error::MediaError;
use super::format::parse_frame_rate;
use super::traits::{MediaGenerator, MediaProber};
use super::types::{ContactSheetJob, MediaInfo, ScreenshotJob};

/// Media implementation that shells out to ffprobe, ffmpeg and mtn.
pub struct FfmpegMedia {
    config: MediaToolsConfig,
}

/// Outcome of running an external tool under a cancellation token.
enum ToolRun {
    Finished(Output),
    NotFound,
}

impl FfmpegMedia {
    /// Creates a media backend with the given tool paths.
    pub fn new(config: MediaToolsConfig) -> Self {
        Self { config }
    }

    /// Creates a backend that resolves every tool from PATH.
    pub fn with_defaults() -> Self {
        Self::new(MediaToolsConfig::default())
    }

    /// Builds ffmpeg arguments for a single-frame extraction.
    fn build_screenshot_args(job: &ScreenshotJob) -> Vec<String> {
        vec![
            "-ss".to_string(),
            format!("{:.2}", job.timestamp_secs),
            "-i".to_string(),
            job.input_path.to_string_lossy().to_string(),
            "-vframes".to_string(),
            "1".to_string(),
            "-q:v".to_string(),
            job.quality.to_string(),
            "-y".to_string(),
            job.output_path.to_string_lossy().to_string(),
        ]
    }

    /// Builds mtn arguments: user args, then output dir, then input.
    fn build_contact_sheet_args(job: &ContactSheetJob) -> Vec<String> {
        let mut args = job.args.clone();
        args.push("-O".to_string());
        args.push(job.output_dir.to_string_lossy().to_string());
        args.push(job.input_path.to_string_lossy().to_string());
        args
    }

    /// Parses ffprobe JSON output.
    ///
    /// Returns `None` when the file has no video stream.
    fn parse_probe_output(output: &str) -> Result<Option<MediaInfo>, MediaError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            #[serde(default)]
            format: ProbeFormat,
            #[serde(default)]
            streams: Vec<ProbeStream>,
        }

        #[derive(Deserialize, Default)]
        struct ProbeFormat {
            duration: Option<String>,
            size: Option<String>,
            bit_rate: Option<String>,
        }

        #[derive(Deserialize)]
        struct ProbeStream {
            codec_type: String,
            codec_name: Option<String>,
            width: Option<u32>,
            height: Option<u32>,
            duration: Option<String>,
            bit_rate: Option<String>,
            r_frame_rate: Option<String>,
            avg_frame_rate: Option<String>,
            sample_rate: Option<String>,
            channels: Option<u32>,
            channel_layout: Option<String>,
            #[serde(default)]
            tags: HashMap<String, String>,
        }

        impl ProbeStream {
            /// Stream bitrate, falling back to the matroska BPS tag.
            fn bit_rate(&self) -> Option<String> {
                self.bit_rate
                    .clone()
                    .filter(|b| !b.is_empty())
                    .or_else(|| self.tags.get("BPS").cloned())
            }
        }

        let probe: ProbeOutput =
            serde_json::from_str(output).map_err(|e| MediaError::ParseError {
                reason: format!("Failed to parse ffprobe output: {}", e),
            })?;

        let Some(video) = probe.streams.iter().find(|s| s.codec_type == "video") else {
            return Ok(None);
        };
        let audio = probe.streams.iter().find(|s| s.codec_type == "audio");

        let mut info = MediaInfo::default();
        let general = [
            ("duration", &probe.format.duration),
            ("size", &probe.format.size),
            ("bit_rate", &probe.format.bit_rate),
        ];
        for (key, value) in general {
            if let Some(value) = value {
                info.general.insert(key.to_string(), value.clone());
            }
        }

        if let Some(codec) = &video.codec_name {
            info.video.insert("codec_name".into(), codec.clone());
        }
        if let Some(width) = video.width.filter(|w| *w > 0) {
            info.video.insert("width".into(), width.to_string());
        }
        if let Some(height) = video.height.filter(|h| *h > 0) {
            info.video.insert("height".into(), height.to_string());
        }
        if let Some(duration) = &video.duration {
            info.video.insert("duration".into(), duration.clone());
        }
        if let Some(rate) = video.bit_rate() {
            info.video.insert("bit_rate".into(), rate);
        }
        if let Some(fps) = video.r_frame_rate.as_ref().filter(|r| !r.is_empty()) {
            info.video.insert("r_frame_rate".into(), fps.clone());
            let decimal = parse_frame_rate(fps);
            if decimal > 0.0 {
                info.video
                    .insert("fps_decimal".into(), format!("{:.3}", decimal));
            }
        }
        if let Some(avg) = video.avg_frame_rate.as_ref().filter(|r| !r.is_empty()) {
            info.video.insert("avg_frame_rate".into(), avg.clone());
        }

        if let Some(audio) = audio {
            if let Some(codec) = &audio.codec_name {
                info.audio.insert("codec_name".into(), codec.clone());
            }
            if let Some(duration) = &audio.duration {
                info.audio.insert("duration".into(), duration.clone());
            }
            if let Some(rate) = audio.bit_rate() {
                info.audio.insert("bit_rate".into(), rate);
            }
            if let Some(rate) = audio.sample_rate.as_ref().filter(|r| !r.is_empty()) {
                info.audio.insert("sample_rate".into(), rate.clone());
            }
            if let Some(channels) = audio.channels.filter(|c| *c > 0) {
                info.audio.insert("channels".into(), channels.to_string());
            }
            if let Some(layout) = audio.channel_layout.as_ref().filter(|l| !l.is_empty()) {
                info.audio.insert("channel_layout".into(), layout.clone());
            }
        }

        Ok(Some(info))
    }

    /// Runs a tool to completion, killing it if `cancel` fires first.
    async fn run_tool(
        program: &Path,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<ToolRun, MediaError> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ToolRun::NotFound),
            Err(e) => return Err(MediaError::Io(e)),
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(MediaError::Cancelled),
            output = child.wait_with_output() => Ok(ToolRun::Finished(output?)),
        }
    }

    /// Locates the contact sheet mtn wrote into `dir`.
    ///
    /// Prefers a `.jpg` named after the input, else takes the first one.
    async fn find_contact_sheet(dir: &Path, input: &Path) -> Result<PathBuf, MediaError> {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut jpgs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.to_lowercase().ends_with(".jpg") {
                jpgs.push(name);
            }
        }
        jpgs.sort();

        jpgs.iter()
            .find(|name| name.starts_with(&stem))
            .or_else(|| jpgs.first())
            .map(|name| dir.join(name))
            .ok_or_else(|| MediaError::OutputMissing {
                dir: dir.to_path_buf(),
            })
    }
}

/// Joins stdout and stderr into one trimmed string.
fn combined_output(output: &Output) -> Option<String> {
    let mut text = String::from_utf8_lossy(&output.stdout).to_string();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[async_trait]
impl MediaProber for FfmpegMedia {
    fn name(&self) -> &str {
        "ffprobe"
    }

    async fn probe(&self, path: &Path) -> Result<Option<MediaInfo>, MediaError> {
        if !path.exists() {
            return Err(MediaError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new(&self.config.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    MediaError::ToolNotFound {
                        tool: "ffprobe",
                        path: self.config.ffprobe_path.clone(),
                    }
                } else {
                    MediaError::Io(e)
                }
            })?;

        // ffprobe rejects files it cannot demux; those are simply not videos.
        if !output.status.success() {
            debug!(path = %path.display(), "ffprobe rejected file");
            return Ok(None);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Self::parse_probe_output(&stdout)
    }
}

#[async_trait]
impl MediaGenerator for FfmpegMedia {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn generate_contact_sheet(
        &self,
        job: ContactSheetJob,
        cancel: &CancellationToken,
    ) -> Result<Option<PathBuf>, MediaError> {
        tokio::fs::create_dir_all(&job.output_dir).await?;

        let args = Self::build_contact_sheet_args(&job);
        let output = match Self::run_tool(&self.config.mtn_path, &args, cancel).await? {
            ToolRun::Finished(output) => output,
            ToolRun::NotFound => {
                warn!(
                    path = %self.config.mtn_path.display(),
                    input = %job.input_path.display(),
                    "mtn not found, skipping contact sheet"
                );
                return Ok(None);
            }
        };

        if !output.status.success() {
            return Err(MediaError::generation_failed(
                format!("mtn exited with code: {:?}", output.status.code()),
                combined_output(&output),
            ));
        }

        match Self::find_contact_sheet(&job.output_dir, &job.input_path).await {
            Ok(path) => Ok(Some(path)),
            Err(e) => {
                if let Some(text) = combined_output(&output) {
                    debug!(input = %job.input_path.display(), output = %text, "mtn output");
                }
                Err(e)
            }
        }
    }

    async fn generate_screenshot(
        &self,
        job: ScreenshotJob,
        cancel: &CancellationToken,
    ) -> Result<(), MediaError> {
        if let Some(parent) = job.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let args = Self::build_screenshot_args(&job);
        let output = match Self::run_tool(&self.config.ffmpeg_path, &args, cancel).await? {
            ToolRun::Finished(output) => output,
            ToolRun::NotFound => {
                return Err(MediaError::ToolNotFound {
                    tool: "ffmpeg",
                    path: self.config.ffmpeg_path.clone(),
                })
            }
        };

        if !output.status.success() {
            return Err(MediaError::generation_failed(
                format!("ffmpeg exited with code: {:?}", output.status.code()),
                combined_output(&output),
            ));
        }

        if !tokio::fs::try_exists(&job.output_path).await.unwrap_or(false) {
            return Err(MediaError::generation_failed(
                "Screenshot file not created",
                None,
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_screenshot_args() {
        let job = ScreenshotJob {
            input_path: PathBuf::from("/in/movie.mkv"),
            output_path: PathBuf::from("/tmp/screenshot_1.jpg"),
            timestamp_secs: 10.0,
            quality: 2,
        };

        let args = FfmpegMedia::build_screenshot_args(&job);
        assert_eq!(
            args,
            vec![
                "-ss",
                "10.00",
                "-i",
                "/in/movie.mkv",
                "-vframes",
                "1",
                "-q:v",
                "2",
                "-y",
                "/tmp/screenshot_1.jpg"
            ]
        );
    }

    #[test]
    fn test_build_contact_sheet_args() {
        let job = ContactSheetJob {
            input_path: PathBuf::from("/in/movie.mkv"),
            output_dir: PathBuf::from("/tmp/out"),
            args: vec!["-c".into(), "4".into()],
        };

        let args = FfmpegMedia::build_contact_sheet_args(&job);
        assert_eq!(args, vec!["-c", "4", "-O", "/tmp/out", "/in/movie.mkv"]);
    }

    #[test]
    fn test_parse_probe_output_video() {
        let json = r#"{
            "format": {
                "filename": "test.mkv",
                "duration": "7200.0",
                "size": "5000000000",
                "bit_rate": "5555555"
            },
            "streams": [
                {
                    "codec_type": "video",
                    "codec_name": "h264",
                    "width": 1920,
                    "height": 1080,
                    "r_frame_rate": "24000/1001",
                    "tags": { "BPS": "4800000" }
                },
                {
                    "codec_type": "audio",
                    "codec_name": "aac",
                    "bit_rate": "192000",
                    "sample_rate": "48000",
                    "channels": 6
                }
            ]
        }"#;

        let info = FfmpegMedia::parse_probe_output(json).unwrap().unwrap();
        assert_eq!(info.general["duration"], "7200.0");
        assert_eq!(info.video["codec_name"], "h264");
        assert_eq!(info.video["width"], "1920");
        assert_eq!(info.video["fps_decimal"], "23.976");
        assert_eq!(info.video["bit_rate"], "4800000");
        assert_eq!(info.audio["channels"], "6");
        assert_eq!(info.audio["sample_rate"], "48000");
    }

    #[test]
    fn test_parse_probe_output_audio_only() {
        let json = r#"{
            "format": { "duration": "180.5" },
            "streams": [ { "codec_type": "audio", "codec_name": "flac" } ]
        }"#;

        assert!(FfmpegMedia::parse_probe_output(json).unwrap().is_none());
    }

    #[test]
    fn test_parse_probe_output_garbage() {
        let err = FfmpegMedia::parse_probe_output("not json").unwrap_err();
        assert!(matches!(err, MediaError::ParseError { .. }));
    }

    #[tokio::test]
    async fn test_find_contact_sheet_prefers_stem() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("another.jpg"), b"x").await.unwrap();
        tokio::fs::write(dir.path().join("movie_s.jpg"), b"x").await.unwrap();
        tokio::fs::write(dir.path().join("movie.txt"), b"x").await.unwrap();

        let found = FfmpegMedia::find_contact_sheet(dir.path(), Path::new("/in/movie.mkv"))
            .await
            .unwrap();
        assert_eq!(found, dir.path().join("movie_s.jpg"));
    }

    #[tokio::test]
    async fn test_find_contact_sheet_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = FfmpegMedia::find_contact_sheet(dir.path(), Path::new("/in/movie.mkv"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::OutputMissing { .. }));
    }

    #[tokio::test]
    async fn test_missing_mtn_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let media = FfmpegMedia::new(MediaToolsConfig {
            mtn_path: PathBuf::from("/nonexistent/mtn-binary"),
            ..Default::default()
        });
        let job = ContactSheetJob {
            input_path: PathBuf::from("/in/movie.mkv"),
            output_dir: dir.path().join("sheet"),
            args: vec![],
        };

        let result = media
            .generate_contact_sheet(job, &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
