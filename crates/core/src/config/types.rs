use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::destination::Destination;
use crate::media::MediaToolsConfig;
use crate::uploader::DestinationConfig;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub tools: MediaToolsConfig,
    /// Connection settings per destination (`[destinations.fastpic]` etc.)
    #[serde(default)]
    pub destinations: BTreeMap<Destination, DestinationConfig>,
    #[serde(default)]
    pub templates: TemplatesConfig,
}

pub const SCREENSHOT_COUNT_MAX: u32 = 20;
pub const SCREENSHOT_QUALITY_RANGE: (u32, u32) = (1, 31);
pub const MINIATURE_SIZE_RANGE: (u32, u32) = (100, 800);

/// Processing settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    /// Screenshots per item (0..=20)
    #[serde(default = "default_screenshot_count")]
    pub screenshot_count: u32,
    /// ffmpeg `-q:v` scale, 1 is best (1..=31)
    #[serde(default = "default_screenshot_quality")]
    pub screenshot_quality: u32,
    #[serde(default = "default_max_concurrent_generation")]
    pub max_concurrent_generation: usize,
    #[serde(default = "default_max_concurrent_uploads")]
    pub max_concurrent_uploads: usize,
    /// Argument string for the contact-sheet tool
    #[serde(default = "default_contact_sheet_args")]
    pub contact_sheet_args: String,
    /// Thumbnail size requested from image hosts (100..=800)
    #[serde(default = "default_image_miniature_size")]
    pub image_miniature_size: u32,
    /// Where to archive generated media; disabled when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_media_directory: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            screenshot_count: default_screenshot_count(),
            screenshot_quality: default_screenshot_quality(),
            max_concurrent_generation: default_max_concurrent_generation(),
            max_concurrent_uploads: default_max_concurrent_uploads(),
            contact_sheet_args: default_contact_sheet_args(),
            image_miniature_size: default_image_miniature_size(),
            save_media_directory: None,
        }
    }
}

fn default_screenshot_count() -> u32 {
    6
}

fn default_screenshot_quality() -> u32 {
    2
}

fn default_max_concurrent_generation() -> usize {
    3
}

fn default_max_concurrent_uploads() -> usize {
    2
}

fn default_contact_sheet_args() -> String {
    "-b 2 -w 1200 -c 4 -r 4 -g 0 -k 1C1C1C -L 4:2 -F F0FFFF:10".to_string()
}

fn default_image_miniature_size() -> u32 {
    350
}

/// A named report template
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TemplatePreset {
    pub id: String,
    pub name: String,
    pub template: String,
}

/// Template presets and the active selection
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TemplatesConfig {
    #[serde(default)]
    pub current_preset_id: String,
    #[serde(default)]
    pub presets: Vec<TemplatePreset>,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            current_preset_id: DEFAULT_PRESET_ID.to_string(),
            presets: default_presets(),
        }
    }
}

pub const DEFAULT_PRESET_ID: &str = "default-pl";

const BASE_TEMPLATE_BODY: &str = "File: %FILE_NAME%
Size: %FILE_SIZE%
Duration: %DURATION%
Video: %VIDEO_CODEC% / %VIDEO_FPS% FPS / %WIDTH%x%HEIGHT% / %VIDEO_BIT_RATE%
Audio: %AUDIO_CODEC% / %AUDIO_SAMPLE_RATE% / %AUDIO_CHANNELS% / %AUDIO_BIT_RATE%
";

/// The built-in presets: one for Fastpic, one for Hamster.
pub fn default_presets() -> Vec<TemplatePreset> {
    vec![
        TemplatePreset {
            id: DEFAULT_PRESET_ID.to_string(),
            name: "PL Default".to_string(),
            template: format!(
                "[spoiler=\"%FILE_NAME% | %FILE_SIZE%\"]\n{}\n%CONTACT_SHEET_FP%\n\n%SCREENSHOTS_FP%\n[/spoiler]",
                BASE_TEMPLATE_BODY
            ),
        },
        TemplatePreset {
            id: "default-emp".to_string(),
            name: "EMP Default".to_string(),
            template: format!(
                "[spoiler=%FILE_NAME% | %FILE_SIZE%]\n{}\n%CONTACT_SHEET_HAM%\n\n%SCREENSHOTS_HAM%\n[/spoiler]",
                BASE_TEMPLATE_BODY
            ),
        },
    ]
}

impl Config {
    /// Replaces out-of-range or missing values with defaults.
    ///
    /// Applied to loaded files so a hand-edited config never blocks startup;
    /// explicit updates go through `validate_config` instead.
    pub fn normalize(&mut self) {
        let defaults = Settings::default();
        let s = &mut self.settings;

        if s.screenshot_count > SCREENSHOT_COUNT_MAX {
            s.screenshot_count = defaults.screenshot_count;
        }
        if !(SCREENSHOT_QUALITY_RANGE.0..=SCREENSHOT_QUALITY_RANGE.1).contains(&s.screenshot_quality) {
            s.screenshot_quality = defaults.screenshot_quality;
        }
        if s.max_concurrent_generation < 1 {
            s.max_concurrent_generation = defaults.max_concurrent_generation;
        }
        if s.max_concurrent_uploads < 1 {
            s.max_concurrent_uploads = defaults.max_concurrent_uploads;
        }
        if !(MINIATURE_SIZE_RANGE.0..=MINIATURE_SIZE_RANGE.1).contains(&s.image_miniature_size) {
            s.image_miniature_size = defaults.image_miniature_size;
        }
        if s.contact_sheet_args.trim().is_empty() {
            s.contact_sheet_args = defaults.contact_sheet_args;
        }

        self.templates.normalize();
    }

    /// Connection settings for a destination (empty when unconfigured).
    pub fn destination(&self, destination: Destination) -> DestinationConfig {
        self.destinations
            .get(&destination)
            .cloned()
            .unwrap_or_default()
    }
}

impl TemplatesConfig {
    /// Restores the default presets when none exist and points the active
    /// id at the first preset when it dangles.
    pub fn normalize(&mut self) {
        if self.presets.is_empty() {
            self.presets = default_presets();
        }
        if !self.presets.iter().any(|p| p.id == self.current_preset_id) {
            self.current_preset_id = self.presets[0].id.clone();
        }
    }
}

/// Sanitized config for display (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub settings: Settings,
    pub tools: MediaToolsConfig,
    pub destinations: BTreeMap<Destination, SanitizedDestinationConfig>,
    pub current_preset_id: String,
    pub preset_names: Vec<String>,
}

/// Sanitized destination config (password and session hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDestinationConfig {
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_url: Option<String>,
    pub username: String,
    pub password_configured: bool,
    pub session_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            settings: config.settings.clone(),
            tools: config.tools.clone(),
            destinations: config
                .destinations
                .iter()
                .map(|(d, c)| {
                    (
                        *d,
                        SanitizedDestinationConfig {
                            endpoint: c.endpoint.clone(),
                            login_url: c.login_url.clone(),
                            username: c.username.clone(),
                            password_configured: !c.password.is_empty(),
                            session_configured: c
                                .session_id
                                .as_deref()
                                .is_some_and(|s| !s.is_empty()),
                        },
                    )
                })
                .collect(),
            current_preset_id: config.templates.current_preset_id.clone(),
            preset_names: config
                .templates
                .presets
                .iter()
                .map(|p| p.name.clone())
                .collect(),
        }
    }
}
