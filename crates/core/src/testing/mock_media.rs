//! Mock media prober and generator for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::media::{
    ContactSheetJob, MediaError, MediaGenerator, MediaInfo, MediaProber, ScreenshotJob,
};

use super::fixtures;

/// How the mock answers contact-sheet requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactSheetBehavior {
    /// Writes `contact_sheet.jpg` into the output directory.
    Produce,
    /// Reports the tool as unavailable.
    ToolMissing,
    /// Fails with a generation error.
    Fail,
}

/// Mock implementation of the media prober and generator traits.
///
/// Provides controllable behavior for testing:
/// - Probe results per path, with a 30 second video as the default
/// - Non-video and failing paths
/// - Failing screenshots by 1-based number
/// - Simulated duration of each generation call, honoring cancellation
/// - Recorded jobs and peak concurrency for assertions
///
/// Generated files are really written so later stages can read them.
#[derive(Debug, Clone)]
pub struct MockMedia {
    probe_results: Arc<RwLock<HashMap<PathBuf, MediaInfo>>>,
    default_media_info: Arc<RwLock<Option<MediaInfo>>>,
    non_video: Arc<RwLock<HashSet<PathBuf>>>,
    probe_failures: Arc<RwLock<HashSet<PathBuf>>>,
    failing_screenshots: Arc<RwLock<HashSet<usize>>>,
    contact_sheet_behavior: Arc<RwLock<ContactSheetBehavior>>,
    operation_delay: Arc<RwLock<Duration>>,
    screenshots: Arc<RwLock<Vec<ScreenshotJob>>>,
    contact_sheets: Arc<RwLock<Vec<ContactSheetJob>>>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Default for MockMedia {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMedia {
    /// Create a new mock that treats every file as a 30 second video.
    pub fn new() -> Self {
        Self {
            probe_results: Arc::new(RwLock::new(HashMap::new())),
            default_media_info: Arc::new(RwLock::new(Some(fixtures::video_info(30.0)))),
            non_video: Arc::new(RwLock::new(HashSet::new())),
            probe_failures: Arc::new(RwLock::new(HashSet::new())),
            failing_screenshots: Arc::new(RwLock::new(HashSet::new())),
            contact_sheet_behavior: Arc::new(RwLock::new(ContactSheetBehavior::Produce)),
            operation_delay: Arc::new(RwLock::new(Duration::ZERO)),
            screenshots: Arc::new(RwLock::new(Vec::new())),
            contact_sheets: Arc::new(RwLock::new(Vec::new())),
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set a probe result for a specific path.
    pub async fn set_probe_result(&self, path: impl AsRef<Path>, info: MediaInfo) {
        self.probe_results
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), info);
    }

    /// Set the media info returned for paths without a specific result.
    /// `None` makes unknown paths probe as non-video.
    pub async fn set_default_media_info(&self, info: Option<MediaInfo>) {
        *self.default_media_info.write().await = info;
    }

    /// Make a path probe as "not a video".
    pub async fn set_non_video(&self, path: impl AsRef<Path>) {
        self.non_video
            .write()
            .await
            .insert(path.as_ref().to_path_buf());
    }

    /// Make probing a path fail.
    pub async fn set_probe_failure(&self, path: impl AsRef<Path>) {
        self.probe_failures
            .write()
            .await
            .insert(path.as_ref().to_path_buf());
    }

    /// Make screenshot number `number` (1-based) fail for every item.
    pub async fn fail_screenshot(&self, number: usize) {
        self.failing_screenshots.write().await.insert(number);
    }

    pub async fn set_contact_sheet_behavior(&self, behavior: ContactSheetBehavior) {
        *self.contact_sheet_behavior.write().await = behavior;
    }

    /// Set the simulated duration of every generation call.
    pub async fn set_operation_delay(&self, delay: Duration) {
        *self.operation_delay.write().await = delay;
    }

    /// Get all recorded screenshot jobs, in call order.
    pub async fn recorded_screenshots(&self) -> Vec<ScreenshotJob> {
        self.screenshots.read().await.clone()
    }

    /// Get all recorded contact-sheet jobs, in call order.
    pub async fn recorded_contact_sheets(&self) -> Vec<ContactSheetJob> {
        self.contact_sheets.read().await.clone()
    }

    /// Total generation calls of either kind.
    pub async fn generation_count(&self) -> usize {
        self.screenshots.read().await.len() + self.contact_sheets.read().await.len()
    }

    /// Highest number of generation calls that were in progress at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Simulates work, returning early with `Cancelled` if the token fires.
    async fn work(&self, cancel: &CancellationToken) -> Result<(), MediaError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = *self.operation_delay.read().await;
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(MediaError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// 1-based screenshot number from a `screenshot_<n>.jpg` output path.
fn screenshot_number(path: &Path) -> Option<usize> {
    path.file_stem()?
        .to_str()?
        .strip_prefix("screenshot_")?
        .parse()
        .ok()
}

#[async_trait]
impl MediaProber for MockMedia {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, path: &Path) -> Result<Option<MediaInfo>, MediaError> {
        if self.probe_failures.read().await.contains(path) {
            return Err(MediaError::probe_failed("mock probe failure"));
        }
        if self.non_video.read().await.contains(path) {
            return Ok(None);
        }
        if let Some(info) = self.probe_results.read().await.get(path) {
            return Ok(Some(info.clone()));
        }
        Ok(self.default_media_info.read().await.clone())
    }
}

#[async_trait]
impl MediaGenerator for MockMedia {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate_contact_sheet(
        &self,
        job: ContactSheetJob,
        cancel: &CancellationToken,
    ) -> Result<Option<PathBuf>, MediaError> {
        self.contact_sheets.write().await.push(job.clone());
        self.work(cancel).await?;

        match *self.contact_sheet_behavior.read().await {
            ContactSheetBehavior::ToolMissing => Ok(None),
            ContactSheetBehavior::Fail => Err(MediaError::generation_failed(
                "mock contact sheet failure",
                None,
            )),
            ContactSheetBehavior::Produce => {
                tokio::fs::create_dir_all(&job.output_dir).await?;
                let path = job.output_dir.join("contact_sheet.jpg");
                tokio::fs::write(&path, b"contact sheet").await?;
                Ok(Some(path))
            }
        }
    }

    async fn generate_screenshot(
        &self,
        job: ScreenshotJob,
        cancel: &CancellationToken,
    ) -> Result<(), MediaError> {
        self.screenshots.write().await.push(job.clone());
        self.work(cancel).await?;

        let fails = match screenshot_number(&job.output_path) {
            Some(n) => self.failing_screenshots.read().await.contains(&n),
            None => false,
        };
        if fails {
            return Err(MediaError::generation_failed("mock screenshot failure", None));
        }

        if let Some(parent) = job.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&job.output_path, b"screenshot").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_probe_defaults_and_overrides() {
        let media = MockMedia::new();
        media.set_non_video("/videos/notes.txt").await;
        media.set_probe_failure("/videos/broken.mkv").await;

        let info = media.probe(Path::new("/videos/a.mkv")).await.unwrap().unwrap();
        assert_eq!(info.duration_secs(), Some(30.0));
        assert!(media.probe(Path::new("/videos/notes.txt")).await.unwrap().is_none());
        assert!(media.probe(Path::new("/videos/broken.mkv")).await.is_err());
    }

    #[tokio::test]
    async fn test_screenshot_failure_by_number() {
        let dir = tempfile::tempdir().unwrap();
        let media = MockMedia::new();
        media.fail_screenshot(2).await;
        let cancel = CancellationToken::new();

        let job = |n: usize| ScreenshotJob {
            input_path: PathBuf::from("/videos/a.mkv"),
            output_path: dir.path().join(format!("screenshot_{}.jpg", n)),
            timestamp_secs: 1.0,
            quality: 2,
        };

        assert!(media.generate_screenshot(job(1), &cancel).await.is_ok());
        assert!(media.generate_screenshot(job(2), &cancel).await.is_err());
        assert!(dir.path().join("screenshot_1.jpg").exists());
        assert_eq!(media.recorded_screenshots().await.len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_delay() {
        let media = MockMedia::new();
        media.set_operation_delay(Duration::from_secs(60)).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let job = ContactSheetJob {
            input_path: PathBuf::from("/videos/a.mkv"),
            output_dir: PathBuf::from("/nonexistent"),
            args: vec![],
        };
        let err = media.generate_contact_sheet(job, &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
