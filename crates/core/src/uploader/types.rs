//! Uploader types and errors.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::destination::Destination;

/// Errors that can occur while initializing or uploading.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{0} has no endpoint configured")]
    NotConfigured(Destination),

    #[error("{0} uploader used before initialization")]
    NotInitialized(Destination),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timeout")]
    Timeout,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Upload cancelled")]
    Cancelled,
}

impl UploadError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::ConnectionFailed(e.to_string())
        } else if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::ApiError(e.to_string())
        }
    }
}

/// Connection settings and credentials for one destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationConfig {
    /// Upload endpoint URL.
    pub endpoint: String,
    /// Optional login URL; when set, `initialize` logs in first.
    pub login_url: Option<String>,
    pub username: String,
    pub password: String,
    /// Pre-established session identifier sent with every upload.
    pub session_id: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

impl DestinationConfig {
    /// Whether a login step is required before uploading.
    pub fn needs_login(&self) -> bool {
        self.login_url.as_deref().is_some_and(|u| !u.is_empty()) && !self.username.is_empty()
    }
}

/// One artifact to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub path: PathBuf,
    /// Client-chosen remote filename, for destinations that accept one.
    pub filename: Option<String>,
    /// Requested thumbnail size in pixels.
    pub thumb_size: u32,
}

/// Links returned by a destination for one uploaded image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    /// Thumbnail link (usually BBCode or a direct URL).
    #[serde(rename = "thumb")]
    pub small: String,
    /// Full-size link.
    pub big: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
}
