//! Derives the generation and upload work a template needs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::destination::Destination;

/// Marker present in every contact-sheet placeholder.
pub const CONTACT_SHEET_MARKER: &str = "CONTACT_SHEET";

/// Marker present in every screenshot placeholder.
pub const SCREENSHOTS_MARKER: &str = "SCREENSHOTS";

/// What one destination needs for the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationNeeds {
    pub contact_sheet: bool,
    pub screenshots: bool,
}

impl DestinationNeeds {
    pub fn any(&self) -> bool {
        self.contact_sheet || self.screenshots
    }
}

/// Run-scoped requirement record computed from the active template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    /// Only destinations that need something are present.
    pub destinations: BTreeMap<Destination, DestinationNeeds>,
}

impl Requirements {
    /// Analyzes template text.
    ///
    /// Content kinds are detected template-wide and then attributed to every
    /// referenced destination. Without any contact-sheet or screenshot marker
    /// the record is empty and no destination is activated.
    pub fn analyze(template: &str) -> Self {
        let contact_sheet = template.contains(CONTACT_SHEET_MARKER);
        let screenshots = template.contains(SCREENSHOTS_MARKER);

        if !contact_sheet && !screenshots {
            return Self::default();
        }

        let destinations = Destination::ALL
            .iter()
            .filter(|d| d.is_referenced_by(template))
            .map(|d| {
                (
                    *d,
                    DestinationNeeds {
                        contact_sheet,
                        screenshots,
                    },
                )
            })
            .collect();

        Self { destinations }
    }

    /// Needs for one destination (all false when not required).
    pub fn needs(&self, destination: Destination) -> DestinationNeeds {
        self.destinations
            .get(&destination)
            .copied()
            .unwrap_or_default()
    }

    /// Destinations that must be initialized for this run.
    pub fn required_destinations(&self) -> impl Iterator<Item = Destination> + '_ {
        self.destinations
            .iter()
            .filter(|(_, needs)| needs.any())
            .map(|(d, _)| *d)
    }

    pub fn any_needs_contact_sheet(&self) -> bool {
        self.destinations.values().any(|n| n.contact_sheet)
    }

    pub fn any_needs_screenshots(&self) -> bool {
        self.destinations.values().any(|n| n.screenshots)
    }

    /// Whether the run has no generation or upload work at all.
    pub fn is_empty(&self) -> bool {
        !self.any_needs_contact_sheet() && !self.any_needs_screenshots()
    }
}
