//! Error types for the media module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while probing or generating media.
#[derive(Debug, Error)]
pub enum MediaError {
    /// An external binary could not be found.
    #[error("{tool} not found at path: {path}")]
    ToolNotFound { tool: &'static str, path: PathBuf },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Failed to probe media file.
    #[error("Failed to probe media file: {reason}")]
    ProbeFailed { reason: String },

    /// Failed to parse probe output.
    #[error("Failed to parse media info: {reason}")]
    ParseError { reason: String },

    /// External generation command failed.
    #[error("{reason}")]
    GenerationFailed {
        reason: String,
        output: Option<String>,
    },

    /// The tool succeeded but produced no usable output.
    #[error("Output not found in {dir}")]
    OutputMissing { dir: PathBuf },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation was cancelled.
    #[error("Generation cancelled")]
    Cancelled,
}

impl MediaError {
    /// Creates a generation failure with optional tool output.
    pub fn generation_failed(reason: impl Into<String>, output: Option<String>) -> Self {
        Self::GenerationFailed {
            reason: reason.into(),
            output,
        }
    }

    /// Creates a probe failure.
    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }

    /// Whether this error only reflects cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
