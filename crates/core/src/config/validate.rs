use super::{
    types::{Config, MINIATURE_SIZE_RANGE, SCREENSHOT_COUNT_MAX, SCREENSHOT_QUALITY_RANGE},
    ConfigError,
};

/// Validate configuration
///
/// Used for explicit updates; loaded files are healed with
/// [`Config::normalize`] instead.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let s = &config.settings;

    if s.screenshot_count > SCREENSHOT_COUNT_MAX {
        return Err(ConfigError::ValidationError(format!(
            "settings.screenshot_count must be between 0 and {}",
            SCREENSHOT_COUNT_MAX
        )));
    }
    let (min, max) = SCREENSHOT_QUALITY_RANGE;
    if !(min..=max).contains(&s.screenshot_quality) {
        return Err(ConfigError::ValidationError(format!(
            "settings.screenshot_quality must be between {} and {}",
            min, max
        )));
    }
    if s.max_concurrent_generation < 1 {
        return Err(ConfigError::ValidationError(
            "settings.max_concurrent_generation must be at least 1".to_string(),
        ));
    }
    if s.max_concurrent_uploads < 1 {
        return Err(ConfigError::ValidationError(
            "settings.max_concurrent_uploads must be at least 1".to_string(),
        ));
    }
    let (min, max) = MINIATURE_SIZE_RANGE;
    if !(min..=max).contains(&s.image_miniature_size) {
        return Err(ConfigError::ValidationError(format!(
            "settings.image_miniature_size must be between {} and {}",
            min, max
        )));
    }

    if config.templates.presets.is_empty() {
        return Err(ConfigError::ValidationError(
            "templates.presets cannot be empty".to_string(),
        ));
    }
    let current = &config.templates.current_preset_id;
    if !config.templates.presets.iter().any(|p| &p.id == current) {
        return Err(ConfigError::PresetNotFound(current.clone()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_screenshot_count() {
        let mut config = Config::default();
        config.settings.screenshot_count = 0;
        assert!(validate_config(&config).is_ok());
        config.settings.screenshot_count = 21;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_quality_and_size() {
        let mut config = Config::default();
        config.settings.screenshot_quality = 32;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.settings.image_miniature_size = 801;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_concurrency() {
        let mut config = Config::default();
        config.settings.max_concurrent_uploads = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_dangling_preset() {
        let mut config = Config::default();
        config.templates.current_preset_id = "nope".into();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::PresetNotFound(_)));
    }
}
