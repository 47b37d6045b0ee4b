//! Types for the processor module.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::{Config, Settings};
use crate::destination::Destination;
use crate::item::RegistryError;
use crate::uploader::DestinationConfig;

/// Status of a resource pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatus {
    /// Pool name ("generation" or "upload").
    pub name: String,
    /// Permits currently held.
    pub active: usize,
    /// Maximum concurrent holders.
    pub capacity: usize,
    /// Waiters blocked on acquire.
    pub queued: usize,
    /// Permits handed out since the pool was created.
    pub total_acquired: u64,
    /// Acquisitions abandoned through cancellation.
    pub total_cancelled: u64,
}

/// Overall pipeline status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStatus {
    /// Whether a run is active.
    pub running: bool,
    pub generation_pool: PoolStatus,
    pub upload_pool: PoolStatus,
    /// Items currently waiting for or generating media.
    pub generating_items: Vec<String>,
    /// Items currently waiting for or performing uploads.
    pub uploading_items: Vec<String>,
}

/// Everything a run reads from configuration, captured at start.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub settings: Settings,
    /// Active template text; decides what is generated and uploaded.
    pub template: String,
    pub destinations: BTreeMap<Destination, DestinationConfig>,
}

impl RunConfig {
    /// Captures the active template and settings from `config`.
    pub fn from_config(config: &Config) -> Self {
        Self {
            settings: config.settings.clone(),
            template: config.templates.current_template(),
            destinations: config.destinations.clone(),
        }
    }

    pub fn destination(&self, destination: Destination) -> DestinationConfig {
        self.destinations
            .get(&destination)
            .cloned()
            .unwrap_or_default()
    }
}

/// Precondition failures of pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// A run is already active.
    #[error("Processing is already running")]
    AlreadyRunning,

    /// Start requested with no pending items.
    #[error("No pending items to process")]
    NothingPending,

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Outcome of a stage that did not complete normally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    /// The run was cancelled; not reported to the user.
    #[error("Cancelled")]
    Cancelled,

    /// The stage failed outright.
    #[error("{0}")]
    Failed(String),
}

/// Media produced for one item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedMedia {
    pub contact_sheet: Option<PathBuf>,
    /// Successful screenshots in generation order.
    pub screenshots: Vec<PathBuf>,
}

impl GeneratedMedia {
    pub fn is_empty(&self) -> bool {
        self.contact_sheet.is_none() && self.screenshots.is_empty()
    }
}

/// Result of adding files to the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddSummary {
    /// Files found after expanding directories.
    pub found: usize,
    /// Items that probed as video and are now pending.
    pub added: usize,
    /// Files removed again (not a video or probe failed).
    pub rejected: usize,
}
