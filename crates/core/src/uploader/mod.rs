//! Uploader abstraction.
//!
//! One [`Uploader`] per [`Destination`], kept in a flat [`UploaderSet`]. The
//! pipeline initializes only the destinations a run's template requires.

mod http;
mod traits;
mod types;

use std::collections::HashMap;
use std::sync::Arc;

pub use http::HttpUploader;
pub use traits::Uploader;
pub use types::{DestinationConfig, UploadError, UploadRequest, UploadedImage};

use crate::destination::Destination;

/// Table of uploaders keyed by destination.
#[derive(Clone, Default)]
pub struct UploaderSet {
    uploaders: HashMap<Destination, Arc<dyn Uploader>>,
}

impl UploaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// An [`HttpUploader`] for every known destination.
    pub fn http() -> Self {
        Destination::ALL
            .iter()
            .fold(Self::new(), |set, d| set.with(Arc::new(HttpUploader::new(*d))))
    }

    /// Adds an uploader, replacing any previous one for its destination.
    pub fn with(mut self, uploader: Arc<dyn Uploader>) -> Self {
        self.insert(uploader);
        self
    }

    pub fn insert(&mut self, uploader: Arc<dyn Uploader>) {
        self.uploaders.insert(uploader.destination(), uploader);
    }

    pub fn get(&self, destination: Destination) -> Option<Arc<dyn Uploader>> {
        self.uploaders.get(&destination).cloned()
    }

    pub fn contains(&self, destination: Destination) -> bool {
        self.uploaders.contains_key(&destination)
    }

    pub fn len(&self) -> usize {
        self.uploaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uploaders.is_empty()
    }
}
