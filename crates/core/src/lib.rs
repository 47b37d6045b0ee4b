pub mod config;
pub mod destination;
pub mod item;
pub mod media;
pub mod metrics;
pub mod observer;
pub mod processor;
pub mod requirements;
pub mod template;
pub mod testing;
pub mod uploader;

pub use config::{
    load_config, load_config_from_str, load_or_default, save_config, validate_config, Config,
    ConfigError, SanitizedConfig, Settings,
};
pub use destination::Destination;
pub use item::{DestinationLinks, Item, ItemRegistry, ProcessingState, RegistryError, Snapshot};
pub use media::{FfmpegMedia, MediaError, MediaGenerator, MediaInfo, MediaProber};
pub use observer::{BroadcastObserver, NoopObserver, Observer, PipelineEvent};
pub use processor::{AddSummary, PipelineProcessor, PipelineStatus, RunConfig, RunError};
pub use requirements::{DestinationNeeds, Requirements};
pub use template::{render_batch, render_item, NO_VALUE};
pub use uploader::{HttpUploader, UploadError, Uploader, UploaderSet};
