use crate::ranking::SelectionMode;
use crate::viewers::ViewerLocale;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoadTestConfig {
    #[validate(length(min = 1))]
    pub name: String,

    #[validate]
    pub catalog: CatalogConfig,

    #[validate]
    pub target: TargetConfig,

    #[validate(custom = "validate_selection")]
    pub selection: SelectionMode,

    #[validate(custom = "validate_locale")]
    pub locale: ViewerLocale,

    pub monitor: MonitorConfig,

    pub output: Option<OutputConfig>,

    /// Optional path to a parent configuration file to inherit from
    pub extends: Option<String>,
}

impl Default for LoadTestConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            catalog: CatalogConfig::default(),
            target: TargetConfig::default(),
            selection: SelectionMode::default(),
            locale: ViewerLocale::default(),
            monitor: MonitorConfig::default(),
            output: None,
            extends: None,
        }
    }
}

/// Where live streams are discovered and how cards are read from the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CatalogConfig {
    #[validate(url)]
    pub url: String,

    #[validate(custom = "validate_css")]
    pub card_selector: String,

    #[validate(custom = "validate_css")]
    pub link_selector: String,

    #[validate(custom = "validate_css")]
    pub viewer_selector: String,

    /// Text whose presence inside a card marks it as live.
    #[validate(length(min = 1))]
    pub badge_text: String,

    #[validate(length(min = 1))]
    pub live_path_marker: String,

    #[validate(range(min = 1))]
    pub timeout_secs: u64,

    pub user_agent: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: "https://www.youtube.com/live?app=desktop".to_string(),
            card_selector: "ytd-rich-grid-media".to_string(),
            link_selector: "#video-title-link".to_string(),
            viewer_selector: "span.inline-metadata-item".to_string(),
            badge_text: "시청 중".to_string(),
            live_path_marker: "/live/".to_string(),
            timeout_secs: 60,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

/// The scraper-trigger endpoint under load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TargetConfig {
    #[validate(url)]
    pub base_url: String,

    #[validate(length(min = 1))]
    pub path: String,

    #[validate(length(min = 1))]
    pub video_id_param: String,

    #[validate(range(min = 100, max = 599))]
    pub success_status: u16,

    /// Per-request timeout; the HTTP client default applies when unset.
    #[validate(range(min = 1))]
    pub timeout_secs: Option<u64>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            path: "/scrapers/start-scraper".to_string(),
            video_id_param: "videoId".to_string(),
            success_status: 302,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub sample_window_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_window_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputConfig {
    Console,
    Json { path: String },
    Csv { path: String },
}

fn default_name() -> String {
    "liveload".to_string()
}

fn validate_css(selector: &str) -> Result<(), ValidationError> {
    scraper::Selector::parse(selector)
        .map(|_| ())
        .map_err(|_| ValidationError::new("css_selector"))
}

fn validate_selection(selection: &SelectionMode) -> Result<(), ValidationError> {
    match selection {
        SelectionMode::Ranked { top_n: 0 } => Err(ValidationError::new("top_n_zero")),
        _ => Ok(()),
    }
}

fn validate_locale(locale: &ViewerLocale) -> Result<(), ValidationError> {
    if locale
        .units
        .iter()
        .any(|u| u.marker.is_empty() || u.multiplier == 0)
    {
        return Err(ValidationError::new("unit_marker"));
    }
    Ok(())
}
