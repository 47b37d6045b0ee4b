//! Capabilities consumed by the pipeline for media work.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use super::error::MediaError;
use super::types::{ContactSheetJob, MediaInfo, ScreenshotJob};

/// Inspects files and reports media attributes.
#[async_trait]
pub trait MediaProber: Send + Sync {
    /// Returns the name of this prober implementation.
    fn name(&self) -> &str;

    /// Probes a file.
    ///
    /// `Ok(None)` means the file is not a video and should be skipped.
    async fn probe(&self, path: &Path) -> Result<Option<MediaInfo>, MediaError>;
}

/// Produces images from a media file.
#[async_trait]
pub trait MediaGenerator: Send + Sync {
    /// Returns the name of this generator implementation.
    fn name(&self) -> &str;

    /// Renders a contact sheet into `job.output_dir`.
    ///
    /// `Ok(None)` means the contact-sheet tool is unavailable and the sheet
    /// was skipped.
    async fn generate_contact_sheet(
        &self,
        job: ContactSheetJob,
        cancel: &CancellationToken,
    ) -> Result<Option<PathBuf>, MediaError>;

    /// Extracts one frame into `job.output_path`.
    async fn generate_screenshot(
        &self,
        job: ScreenshotJob,
        cancel: &CancellationToken,
    ) -> Result<(), MediaError>;
}
