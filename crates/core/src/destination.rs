//! Remote image-hosting destinations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A remote image host that artifacts can be uploaded to.
///
/// Each destination is addressed in templates by a short marker suffix,
/// e.g. `%SCREENSHOTS_FP%` or `%CONTACT_SHEET_HAM_BIG%`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Fastpic,
    Imgbox,
    Hamster,
}

impl Destination {
    /// All known destinations, in report order.
    pub const ALL: [Destination; 3] = [Destination::Fastpic, Destination::Imgbox, Destination::Hamster];

    /// Template marker suffix.
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Fastpic => "FP",
            Self::Imgbox => "IB",
            Self::Hamster => "HAM",
        }
    }

    /// Human readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Fastpic => "Fastpic",
            Self::Imgbox => "Imgbox",
            Self::Hamster => "Hamster",
        }
    }

    /// Whether uploads to this destination carry a client-chosen filename.
    pub fn takes_filename(&self) -> bool {
        matches!(self, Self::Fastpic)
    }

    /// Whether the template text references this destination.
    ///
    /// A marker counts when followed by `_` (e.g. `_FP_BIG`) or by the
    /// closing `%` of a placeholder.
    pub fn is_referenced_by(&self, template: &str) -> bool {
        let marker = self.marker();
        template.contains(&format!("_{}_", marker)) || template.contains(&format!("_{}%", marker))
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers() {
        assert_eq!(Destination::Fastpic.marker(), "FP");
        assert_eq!(Destination::Imgbox.marker(), "IB");
        assert_eq!(Destination::Hamster.marker(), "HAM");
    }

    #[test]
    fn test_is_referenced_by() {
        assert!(Destination::Fastpic.is_referenced_by("%SCREENSHOTS_FP%"));
        assert!(Destination::Fastpic.is_referenced_by("%CONTACT_SHEET_FP_BIG%"));
        assert!(!Destination::Fastpic.is_referenced_by("%FP%"));
        assert!(!Destination::Imgbox.is_referenced_by("%SCREENSHOTS_FP%"));
        assert!(Destination::Hamster.is_referenced_by("%SCREENSHOTS_HAM_SPACED%"));
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Destination::Imgbox).unwrap();
        assert_eq!(json, "\"imgbox\"");
    }
}
