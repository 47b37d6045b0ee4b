//! Generic multipart HTTP uploader.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::traits::Uploader;
use super::types::{DestinationConfig, UploadError, UploadRequest, UploadedImage};
use crate::destination::Destination;

/// Per-run state created by `initialize`.
struct Session {
    client: Client,
    config: DestinationConfig,
}

/// Uploads images as `multipart/form-data` to a configured endpoint.
///
/// The endpoint must answer with JSON `{"thumb": .., "big": .., "album": ..}`.
/// When a login URL is configured, `initialize` posts the credentials as a
/// form and keeps the session cookie for subsequent uploads.
pub struct HttpUploader {
    destination: Destination,
    session: RwLock<Option<Session>>,
}

impl HttpUploader {
    pub fn new(destination: Destination) -> Self {
        Self {
            destination,
            session: RwLock::new(None),
        }
    }

    async fn login(&self, client: &Client, config: &DestinationConfig) -> Result<(), UploadError> {
        let Some(url) = config.login_url.as_deref() else {
            return Ok(());
        };

        let params = [
            ("username", config.username.as_str()),
            ("password", config.password.as_str()),
        ];
        let response = client.post(url).form(&params).send().await?;

        let status = response.status();
        if status.is_success() {
            debug!(destination = %self.destination, "login successful");
            Ok(())
        } else if status.as_u16() == 401 || status.as_u16() == 403 {
            Err(UploadError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(UploadError::AuthenticationFailed(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(100).collect::<String>()
            )))
        }
    }

    /// Builds the multipart body for one upload.
    async fn build_form(
        request: &UploadRequest,
        config: &DestinationConfig,
    ) -> Result<multipart::Form, UploadError> {
        let data = tokio::fs::read(&request.path).await?;
        let file_name = request.filename.clone().unwrap_or_else(|| {
            request
                .path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "image.jpg".to_string())
        });

        let part = multipart::Part::bytes(data)
            .file_name(file_name)
            .mime_str("image/jpeg")
            .map_err(|e| UploadError::ApiError(e.to_string()))?;

        let mut form = multipart::Form::new()
            .part("image", part)
            .text("thumb_size", request.thumb_size.to_string());
        if let Some(session_id) = config.session_id.as_deref().filter(|s| !s.is_empty()) {
            form = form.text("session_id", session_id.to_string());
        }
        Ok(form)
    }

    async fn send(
        client: &Client,
        config: &DestinationConfig,
        request: &UploadRequest,
    ) -> Result<UploadedImage, UploadError> {
        let form = Self::build_form(request, config).await?;
        let response = client.post(&config.endpoint).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::ApiError(format!("HTTP {}", status)));
        }

        let body = response.text().await?;
        parse_upload_response(&body)
    }
}

/// Parses and validates the endpoint's JSON answer.
fn parse_upload_response(body: &str) -> Result<UploadedImage, UploadError> {
    let image: UploadedImage = serde_json::from_str(body).map_err(|e| {
        UploadError::InvalidResponse(format!(
            "{}: {}",
            e,
            body.chars().take(100).collect::<String>()
        ))
    })?;

    if image.small.is_empty() && image.big.is_empty() {
        return Err(UploadError::InvalidResponse(
            "response carries no links".to_string(),
        ));
    }
    Ok(UploadedImage {
        album: image.album.filter(|a| !a.is_empty()),
        ..image
    })
}

#[async_trait]
impl Uploader for HttpUploader {
    fn destination(&self) -> Destination {
        self.destination
    }

    async fn initialize(
        &self,
        config: &DestinationConfig,
        cancel: &CancellationToken,
    ) -> Result<(), UploadError> {
        if config.endpoint.is_empty() {
            return Err(UploadError::NotConfigured(self.destination));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .cookie_store(true)
            .build()
            .map_err(|e| UploadError::ApiError(format!("Failed to create HTTP client: {}", e)))?;

        if config.needs_login() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(UploadError::Cancelled),
                result = self.login(&client, config) => result?,
            }
        }

        *self.session.write().await = Some(Session {
            client,
            config: config.clone(),
        });
        Ok(())
    }

    async fn upload(
        &self,
        request: UploadRequest,
        cancel: &CancellationToken,
    ) -> Result<UploadedImage, UploadError> {
        let (client, config) = {
            let session = self.session.read().await;
            let session = session
                .as_ref()
                .ok_or(UploadError::NotInitialized(self.destination))?;
            (session.client.clone(), session.config.clone())
        };

        debug!(
            destination = %self.destination,
            path = %request.path.display(),
            "uploading"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(UploadError::Cancelled),
            result = Self::send(&client, &config, &request) => result,
        }
    }
}
