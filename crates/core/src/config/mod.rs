mod loader;
mod presets;
mod types;
mod validate;

pub use loader::*;
pub use types::*;
pub use validate::validate_config;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Failed to write configuration: {0}")]
    WriteError(String),

    #[error("Cannot delete the last template preset")]
    LastPreset,

    #[error("Template preset not found: {0}")]
    PresetNotFound(String),
}
