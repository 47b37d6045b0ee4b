//! Uploader trait definition.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::types::{DestinationConfig, UploadError, UploadRequest, UploadedImage};
use crate::destination::Destination;

/// Uploads artifacts to one remote destination.
///
/// Implementations must be thread-safe; a single instance serves every
/// concurrent upload of a run.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Destination this uploader serves.
    fn destination(&self) -> Destination;

    /// Prepares the uploader for a run (login, session setup).
    ///
    /// Called once per run, only when the destination is required.
    async fn initialize(
        &self,
        _config: &DestinationConfig,
        _cancel: &CancellationToken,
    ) -> Result<(), UploadError> {
        Ok(())
    }

    /// Uploads one image and returns its hosted links.
    async fn upload(
        &self,
        request: UploadRequest,
        cancel: &CancellationToken,
    ) -> Result<UploadedImage, UploadError>;
}
