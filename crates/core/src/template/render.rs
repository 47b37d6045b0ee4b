//! Placeholder substitution passes.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::destination::Destination;
use crate::item::{DestinationLinks, Item, ProcessingState};

/// Replacement for tokens with no value on the item.
pub const NO_VALUE: &str = "\u{2212}";

/// Any `%TOKEN%`-shaped span left after the fixed passes.
static RESIDUAL_TOKEN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"%[^%]+%").ok());

/// Piece of partially rendered text.
///
/// Only `Literal` text is searched for placeholders.
#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Value(String),
}

struct Rendering {
    segments: Vec<Segment>,
}

impl Rendering {
    fn new(template: &str) -> Self {
        Self {
            segments: vec![Segment::Literal(template.to_string())],
        }
    }

    /// Replaces every occurrence of `placeholder` in literal text.
    fn replace(&mut self, placeholder: &str, value: &str) {
        let mut out = Vec::with_capacity(self.segments.len());
        for segment in self.segments.drain(..) {
            match segment {
                Segment::Literal(text) if text.contains(placeholder) => {
                    let mut parts = text.split(placeholder).peekable();
                    while let Some(part) = parts.next() {
                        if !part.is_empty() {
                            out.push(Segment::Literal(part.to_string()));
                        }
                        if parts.peek().is_some() {
                            out.push(Segment::Value(value.to_string()));
                        }
                    }
                }
                other => out.push(other),
            }
        }
        self.segments = out;
    }

    /// Resolves remaining tokens with `resolve`.
    fn replace_residual(&mut self, resolve: impl Fn(&str) -> String) {
        let Some(re) = RESIDUAL_TOKEN.as_ref() else {
            return;
        };

        for segment in &mut self.segments {
            if let Segment::Literal(text) = segment {
                if re.is_match(text) {
                    let replaced = re
                        .replace_all(text, |caps: &regex_lite::Captures<'_>| resolve(&caps[0]))
                        .into_owned();
                    *segment = Segment::Value(replaced);
                }
            }
        }
    }

    fn finish(self) -> String {
        self.segments
            .into_iter()
            .map(|s| match s {
                Segment::Literal(text) | Segment::Value(text) => text,
            })
            .collect()
    }
}

/// Renders one item.
pub fn render_item(template: &str, item: &Item) -> String {
    let mut rendering = Rendering::new(template);

    let scalars = [
        ("%FILE_NAME%", &item.file_name),
        ("%FILE_SIZE%", &item.file_size),
        ("%DURATION%", &item.duration),
        ("%WIDTH%", &item.width),
        ("%HEIGHT%", &item.height),
        ("%BIT_RATE%", &item.bit_rate),
        ("%VIDEO_BIT_RATE%", &item.video_bit_rate),
        ("%AUDIO_BIT_RATE%", &item.audio_bit_rate),
        ("%VIDEO_CODEC%", &item.video_codec),
        ("%AUDIO_CODEC%", &item.audio_codec),
    ];
    for (placeholder, value) in scalars {
        rendering.replace(placeholder, value);
    }

    let empty = DestinationLinks::default();

    for destination in Destination::ALL {
        let links = item.links(destination).unwrap_or(&empty);
        let marker = destination.marker();
        rendering.replace(&format!("%CONTACT_SHEET_{}%", marker), &links.contact_sheet);
        rendering.replace(
            &format!("%CONTACT_SHEET_{}_BIG%", marker),
            &links.contact_sheet_big,
        );
    }

    for destination in Destination::ALL {
        let links = item.links(destination).unwrap_or(&empty);
        let marker = destination.marker();
        replace_group(
            &mut rendering,
            &format!("SCREENSHOTS_{}", marker),
            &links.screenshots,
        );
        replace_group(
            &mut rendering,
            &format!("SCREENSHOTS_{}_BIG", marker),
            &links.screenshots_big,
        );
    }

    rendering.replace_residual(|token| {
        item.params
            .get(token)
            .filter(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| NO_VALUE.to_string())
    });

    rendering.finish()
}

/// Fills `%<base>%` with newline-joined links and `%<base>_SPACED%` with
/// space-joined links. Empty entries are skipped.
fn replace_group(rendering: &mut Rendering, base: &str, links: &[String]) {
    let present: Vec<&str> = links
        .iter()
        .map(String::as_str)
        .filter(|l| !l.is_empty())
        .collect();

    rendering.replace(&format!("%{}%", base), &present.join("\n"));
    rendering.replace(&format!("%{}_SPACED%", base), &present.join(" "));
}

/// Renders every completed item in order, separated by a blank line.
pub fn render_batch(template: &str, items: &[Item]) -> String {
    items
        .iter()
        .filter(|item| item.state == ProcessingState::Completed)
        .map(|item| render_item(template, item))
        .collect::<Vec<_>>()
        .join("\n\n")
}
