//! Media items and the registry that tracks them through a run.

mod registry;
mod types;

pub use registry::{ItemRegistry, RegistryError};
pub use types::{DestinationLinks, Item, ProcessingState, Snapshot};
