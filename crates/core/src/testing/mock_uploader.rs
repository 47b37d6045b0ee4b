//! Mock uploader for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::destination::Destination;
use crate::uploader::{DestinationConfig, UploadError, UploadRequest, UploadedImage, Uploader};

/// Mock implementation of the Uploader trait.
///
/// Successful uploads return `<marker>-small-<file>` and `<marker>-big-<file>`
/// where `<file>` is the artifact's file name on disk, e.g.
/// `FP-small-screenshot_2.jpg`.
///
/// # Example
///
/// ```rust,ignore
/// use spoilr_core::testing::MockUploader;
///
/// let uploader = MockUploader::new(Destination::Fastpic);
/// uploader.fail_file("screenshot_3.jpg").await;
/// uploader.set_delay_for("screenshot_1.jpg", Duration::from_millis(50)).await;
///
/// // ... run the pipeline ...
///
/// assert_eq!(uploader.upload_count().await, 4);
/// ```
#[derive(Debug, Clone)]
pub struct MockUploader {
    destination: Destination,
    uploads: Arc<RwLock<Vec<UploadRequest>>>,
    initialized: Arc<RwLock<Vec<DestinationConfig>>>,
    init_error: Arc<RwLock<Option<String>>>,
    failing_files: Arc<RwLock<HashSet<String>>>,
    delay: Arc<RwLock<Duration>>,
    file_delays: Arc<RwLock<HashMap<String, Duration>>>,
    album: Arc<RwLock<Option<String>>>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl MockUploader {
    /// Create a mock for `destination`.
    pub fn new(destination: Destination) -> Self {
        Self {
            destination,
            uploads: Arc::new(RwLock::new(Vec::new())),
            initialized: Arc::new(RwLock::new(Vec::new())),
            init_error: Arc::new(RwLock::new(None)),
            failing_files: Arc::new(RwLock::new(HashSet::new())),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
            file_delays: Arc::new(RwLock::new(HashMap::new())),
            album: Arc::new(RwLock::new(None)),
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get all recorded upload requests, in call order.
    pub async fn recorded_uploads(&self) -> Vec<UploadRequest> {
        self.uploads.read().await.clone()
    }

    /// Get the number of uploads attempted.
    pub async fn upload_count(&self) -> usize {
        self.uploads.read().await.len()
    }

    /// Configurations passed to `initialize`.
    pub async fn recorded_initializations(&self) -> Vec<DestinationConfig> {
        self.initialized.read().await.clone()
    }

    /// Make `initialize` fail with an authentication error.
    pub async fn set_init_error(&self, message: impl Into<String>) {
        *self.init_error.write().await = Some(message.into());
    }

    /// Make uploads of the artifact named `file_name` fail.
    pub async fn fail_file(&self, file_name: impl Into<String>) {
        self.failing_files.write().await.insert(file_name.into());
    }

    /// Set the simulated duration of every upload.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Set the simulated duration for one artifact file name.
    pub async fn set_delay_for(&self, file_name: impl Into<String>, delay: Duration) {
        self.file_delays.write().await.insert(file_name.into(), delay);
    }

    /// Album link returned with every upload.
    pub async fn set_album(&self, album: impl Into<String>) {
        *self.album.write().await = Some(album.into());
    }

    /// Highest number of uploads that were in progress at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[async_trait]
impl Uploader for MockUploader {
    fn destination(&self) -> Destination {
        self.destination
    }

    async fn initialize(
        &self,
        config: &DestinationConfig,
        _cancel: &CancellationToken,
    ) -> Result<(), UploadError> {
        self.initialized.write().await.push(config.clone());
        match self.init_error.read().await.clone() {
            Some(message) => Err(UploadError::AuthenticationFailed(message)),
            None => Ok(()),
        }
    }

    async fn upload(
        &self,
        request: UploadRequest,
        cancel: &CancellationToken,
    ) -> Result<UploadedImage, UploadError> {
        let name = file_name(&request.path);
        self.uploads.write().await.push(request);

        let delay = match self.file_delays.read().await.get(&name) {
            Some(delay) => *delay,
            None => *self.delay.read().await,
        };

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let waited = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(UploadError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        };
        self.active.fetch_sub(1, Ordering::SeqCst);
        waited?;

        if self.failing_files.read().await.contains(&name) {
            return Err(UploadError::ApiError(format!("mock rejected {}", name)));
        }

        let marker = self.destination.marker();
        Ok(UploadedImage {
            small: format!("{}-small-{}", marker, name),
            big: format!("{}-big-{}", marker, name),
            album: self.album.read().await.clone(),
        })
    }
}
