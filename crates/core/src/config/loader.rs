use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

use super::{types::Config, ConfigError};

/// File name used for both portable and per-user configs
pub const CONFIG_FILE_NAME: &str = "spoilr.toml";

/// Environment prefix; nested keys use `__`, e.g. `SPOILR_SETTINGS__SCREENSHOT_COUNT`
pub const ENV_PREFIX: &str = "SPOILR_";

fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).split("__")
}

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let mut config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.normalize();
    Ok(config)
}

/// Load configuration, falling back to defaults when the file is missing
pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
    match load_config(path) {
        Err(ConfigError::FileNotFound(_)) => {
            let mut config: Config = Figment::from(Serialized::defaults(Config::default()))
                .merge(env_provider())
                .extract()
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            config.normalize();
            Ok(config)
        }
        other => other,
    }
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    let mut config: Config =
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    config.normalize();
    Ok(config)
}

/// Write configuration as TOML, creating parent directories
pub fn save_config(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
    }

    let text =
        toml::to_string_pretty(config).map_err(|e| ConfigError::WriteError(e.to_string()))?;
    std::fs::write(path, text).map_err(|e| ConfigError::WriteError(e.to_string()))
}

/// Resolve the config path
///
/// A `spoilr.toml` in the working directory wins (portable mode); otherwise
/// the per-user config directory is used.
pub fn default_config_path() -> PathBuf {
    let portable = PathBuf::from(CONFIG_FILE_NAME);
    if portable.exists() {
        return portable;
    }

    dirs::config_dir()
        .map(|dir| dir.join("spoilr").join(CONFIG_FILE_NAME))
        .unwrap_or(portable)
}
