//! Types for tracked media items.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::destination::Destination;

/// Processing state of an item.
///
/// Within one run an item only moves forward along
/// `AnalyzingMedia -> Pending -> WaitingForGenerationSlot -> GeneratingMedia
/// -> WaitingForUploadSlot -> Uploading -> Completed`, or to `Error`.
/// `Pending` is also reachable from anywhere through a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    Pending,
    AnalyzingMedia,
    WaitingForGenerationSlot,
    GeneratingMedia,
    WaitingForUploadSlot,
    Uploading,
    Completed,
    Error,
}

impl ProcessingState {
    /// Position along the forward path of a run.
    fn rank(&self) -> u8 {
        match self {
            Self::AnalyzingMedia => 0,
            Self::Pending => 1,
            Self::WaitingForGenerationSlot => 2,
            Self::GeneratingMedia => 3,
            Self::WaitingForUploadSlot => 4,
            Self::Uploading => 5,
            Self::Completed => 6,
            Self::Error => 7,
        }
    }

    /// Whether this is a terminal state for a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Whether the item is somewhere inside an active run.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::WaitingForGenerationSlot
                | Self::GeneratingMedia
                | Self::WaitingForUploadSlot
                | Self::Uploading
        )
    }

    /// Whether moving from `self` to `next` is allowed.
    pub fn can_transition_to(&self, next: ProcessingState) -> bool {
        match next {
            Self::Pending => true,
            _ if self.is_terminal() => false,
            Self::Error => true,
            _ => next.rank() > self.rank(),
        }
    }

    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::AnalyzingMedia => "analyzing_media",
            Self::WaitingForGenerationSlot => "waiting_for_generation_slot",
            Self::GeneratingMedia => "generating_media",
            Self::WaitingForUploadSlot => "waiting_for_upload_slot",
            Self::Uploading => "uploading",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hosted links produced for one destination.
///
/// Screenshot sequences are index-aligned with the screenshot generation
/// order. Slots that have not completed (or failed) hold empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationLinks {
    pub contact_sheet: String,
    pub contact_sheet_big: String,
    pub screenshots: Vec<String>,
    pub screenshots_big: Vec<String>,
}

impl DestinationLinks {
    /// Writes the links for screenshot `index`, growing both sequences as needed.
    pub fn set_screenshot(&mut self, index: usize, small: String, big: String) {
        grow_to(&mut self.screenshots, index);
        grow_to(&mut self.screenshots_big, index);
        self.screenshots[index] = small;
        self.screenshots_big[index] = big;
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.contact_sheet.is_empty()
            && self.contact_sheet_big.is_empty()
            && self.screenshots.iter().all(String::is_empty)
            && self.screenshots_big.iter().all(String::is_empty)
    }
}

fn grow_to(seq: &mut Vec<String>, index: usize) {
    if seq.len() <= index {
        seq.resize(index + 1, String::new());
    }
}

/// A media file tracked through the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique, immutable identifier.
    pub id: String,
    pub file_name: String,
    pub file_path: PathBuf,
    /// Human readable size, e.g. "1.4 GB".
    pub file_size: String,
    pub file_size_bytes: u64,
    /// Human readable duration, e.g. "1:32:05".
    pub duration: String,
    /// Duration in seconds, used to place screenshots.
    pub duration_secs: f64,
    pub width: String,
    pub height: String,
    pub bit_rate: String,
    pub video_bit_rate: String,
    pub audio_bit_rate: String,
    pub video_codec: String,
    pub audio_codec: String,
    /// Placeholder token (including the `%` delimiters) to value.
    pub params: BTreeMap<String, String>,
    /// Hosted links per destination.
    pub results: BTreeMap<Destination, DestinationLinks>,
    /// Album link, first writer wins.
    pub album_link: String,
    pub state: ProcessingState,
    /// Terminal error message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Non-fatal warnings accumulated during the run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Default for ProcessingState {
    fn default() -> Self {
        Self::AnalyzingMedia
    }
}

impl Item {
    /// Creates a freshly registered item in `AnalyzingMedia`.
    pub fn new(id: impl Into<String>, file_path: impl Into<PathBuf>) -> Self {
        let file_path = file_path.into();
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            id: id.into(),
            file_name,
            file_path,
            state: ProcessingState::AnalyzingMedia,
            ..Default::default()
        }
    }

    /// File name without its extension.
    pub fn stem(&self) -> String {
        self.file_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.file_name.clone())
    }

    /// Links for a destination, if any were recorded.
    pub fn links(&self, destination: Destination) -> Option<&DestinationLinks> {
        self.results.get(&destination)
    }

    /// Mutable links for a destination, created on first use.
    pub fn links_mut(&mut self, destination: Destination) -> &mut DestinationLinks {
        self.results.entry(destination).or_default()
    }

    /// Records the album link unless one is already set.
    pub fn offer_album_link(&mut self, album: &str) {
        if self.album_link.is_empty() && !album.is_empty() {
            self.album_link = album.to_string();
        }
    }

    /// Clears all result links, the terminal error and warnings.
    pub fn clear_results(&mut self) {
        self.results.clear();
        self.album_link.clear();
        self.error = None;
        self.warnings.clear();
    }

    /// Returns the item to `Pending` with all results cleared.
    pub fn reset(&mut self) {
        self.clear_results();
        self.state = ProcessingState::Pending;
    }
}

/// State published to observers after every mutation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Whether a processing run is active.
    pub processing: bool,
    /// Items in registry order.
    pub items: Vec<Item>,
}
