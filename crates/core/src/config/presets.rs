//! Template preset management.

use uuid::Uuid;

use super::types::{default_presets, TemplatePreset, TemplatesConfig};
use super::ConfigError;

impl TemplatesConfig {
    /// The active preset, falling back to the first one.
    pub fn current(&self) -> Option<&TemplatePreset> {
        self.presets
            .iter()
            .find(|p| p.id == self.current_preset_id)
            .or_else(|| self.presets.first())
    }

    /// Text of the active template.
    pub fn current_template(&self) -> String {
        match self.current() {
            Some(preset) => preset.template.clone(),
            None => default_presets()[0].template.clone(),
        }
    }

    /// Replaces the text of the active preset.
    pub fn set_current_template(&mut self, template: impl Into<String>) -> Result<(), ConfigError> {
        let current = self.current_preset_id.clone();
        let preset = self
            .presets
            .iter_mut()
            .find(|p| p.id == current)
            .ok_or(ConfigError::PresetNotFound(current))?;
        preset.template = template.into();
        Ok(())
    }

    /// Adds a new preset and returns it.
    pub fn save_preset(
        &mut self,
        name: impl Into<String>,
        template: impl Into<String>,
    ) -> Result<TemplatePreset, ConfigError> {
        let name = name.into();
        let template = template.into();
        if name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "preset name cannot be empty".to_string(),
            ));
        }
        if template.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "preset template cannot be empty".to_string(),
            ));
        }

        let preset = TemplatePreset {
            id: Uuid::new_v4().to_string(),
            name,
            template,
        };
        self.presets.push(preset.clone());
        Ok(preset)
    }

    /// Removes a preset. Deleting the active one switches to the first left.
    pub fn delete_preset(&mut self, id: &str) -> Result<(), ConfigError> {
        if self.presets.len() <= 1 {
            return Err(ConfigError::LastPreset);
        }
        let index = self
            .presets
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| ConfigError::PresetNotFound(id.to_string()))?;

        self.presets.remove(index);
        if self.current_preset_id == id {
            self.current_preset_id = self.presets[0].id.clone();
        }
        Ok(())
    }

    /// Makes `id` the active preset.
    pub fn set_current_preset(&mut self, id: &str) -> Result<(), ConfigError> {
        if !self.presets.iter().any(|p| p.id == id) {
            return Err(ConfigError::PresetNotFound(id.to_string()));
        }
        self.current_preset_id = id.to_string();
        Ok(())
    }

    /// Looks a preset up by id or, failing that, by name.
    pub fn find(&self, id_or_name: &str) -> Option<&TemplatePreset> {
        self.presets
            .iter()
            .find(|p| p.id == id_or_name)
            .or_else(|| self.presets.iter().find(|p| p.name == id_or_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_template_defaults_to_fastpic() {
        let templates = TemplatesConfig::default();
        assert!(templates.current_template().contains("%SCREENSHOTS_FP%"));
    }

    #[test]
    fn test_set_current_template_edits_active() {
        let mut templates = TemplatesConfig::default();
        templates.set_current_template("%FILE_NAME%").unwrap();
        assert_eq!(templates.current_template(), "%FILE_NAME%");
        assert!(templates.presets[1].template.contains("%SCREENSHOTS_HAM%"));
    }

    #[test]
    fn test_save_preset() {
        let mut templates = TemplatesConfig::default();
        let preset = templates.save_preset("Mine", "%FILE_NAME%").unwrap();
        assert_eq!(templates.presets.len(), 3);
        assert!(Uuid::parse_str(&preset.id).is_ok());
        assert_eq!(templates.find("Mine").unwrap().id, preset.id);

        assert!(templates.save_preset("", "x").is_err());
        assert!(templates.save_preset("x", "  ").is_err());
    }

    #[test]
    fn test_delete_active_switches_to_first() {
        let mut templates = TemplatesConfig::default();
        templates.set_current_preset("default-emp").unwrap();
        templates.delete_preset("default-emp").unwrap();
        assert_eq!(templates.current_preset_id, "default-pl");
    }

    #[test]
    fn test_delete_last_preset_rejected() {
        let mut templates = TemplatesConfig::default();
        templates.delete_preset("default-emp").unwrap();
        let err = templates.delete_preset("default-pl").unwrap_err();
        assert!(matches!(err, ConfigError::LastPreset));
        assert_eq!(templates.presets.len(), 1);
    }

    #[test]
    fn test_unknown_ids() {
        let mut templates = TemplatesConfig::default();
        assert!(matches!(
            templates.delete_preset("nope"),
            Err(ConfigError::PresetNotFound(_))
        ));
        assert!(matches!(
            templates.set_current_preset("nope"),
            Err(ConfigError::PresetNotFound(_))
        ));
        assert_eq!(templates.current_preset_id, "default-pl");
    }
}
