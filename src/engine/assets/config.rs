// Loader configuration
//
// Everything here has a default, so an empty JSON object is a valid config.

use super::AssetError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Percentage of the progress bar reserved for each sound that must decode
pub const DEFAULT_DECODE_MODIFIER: f32 = 2.0;

/// How long to wait for outstanding decodes after the fetch completes
pub const DEFAULT_DECODE_TIMEOUT_MS: u64 = 30_000;

/// Per-directory overrides, relative to the base URL
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PathOverrides {
    pub asset_path: Option<String>,
    pub data_path: Option<String>,
    pub spritesheet_path: Option<String>,
    pub img_path: Option<String>,
    pub font_path: Option<String>,
    pub audio_sprite_path: Option<String>,
    pub sound_path: Option<String>,
}

/// Suffix appended to image and atlas file names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "1x")]
    Standard,
    #[serde(rename = "2x")]
    Double,
    #[serde(rename = "3x")]
    Triple,
}

impl Resolution {
    pub fn suffix(&self) -> &'static str {
        match self {
            Resolution::Standard => "",
            Resolution::Double => "@2x",
            Resolution::Triple => "@3x",
        }
    }
}

/// Device class the loader runs on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Desktop,
    Android,
    Ios,
}

impl Platform {
    /// iOS decodes m4a much faster than the other formats
    pub fn prefers_m4a(&self) -> bool {
        matches!(self, Platform::Ios)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoaderConfig {
    pub base_url: String,
    pub paths: PathOverrides,
    pub resolution: Resolution,
    pub platform: Platform,
    pub decode_modifier: f32,
    /// `null` waits forever
    pub decode_timeout_ms: Option<u64>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            paths: PathOverrides::default(),
            resolution: Resolution::default(),
            platform: Platform::default(),
            decode_modifier: DEFAULT_DECODE_MODIFIER,
            decode_timeout_ms: Some(DEFAULT_DECODE_TIMEOUT_MS),
        }
    }
}

impl LoaderConfig {
    /// Parse a config from JSON text
    pub fn from_json(text: &str) -> Result<Self, AssetError> {
        serde_json::from_str(text).map_err(|e| AssetError::Config(e.to_string()))
    }

    /// Read and parse a JSON config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn decode_timeout(&self) -> Option<Duration> {
        self.decode_timeout_ms.map(Duration::from_millis)
    }
}
