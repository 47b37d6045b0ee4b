//! Report rendering from user templates.
//!
//! Templates are plain text with `%TOKEN%` placeholders. Rendering runs
//! ordered substitution passes over one item: scalar metadata, contact sheet
//! links, screenshot groups, then any remaining token from the item's
//! parameter map. Text inserted by one pass is never rewritten by a later one.

mod render;

pub use render::{render_batch, render_item, NO_VALUE};
