// Asset kinds and URL resolution

use super::config::{LoaderConfig, PathOverrides, Platform, Resolution};
use serde::Deserialize;

/// Supported asset types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetType {
    Sound,
    AudioSprite,
    Image,
    Atlas,
    Text,
    BitmapFont,
    AssetList,
}

impl AssetType {
    /// Name used for this type in manifests
    pub fn manifest_name(&self) -> &'static str {
        match self {
            AssetType::Sound => "sound",
            AssetType::AudioSprite => "audioSprite",
            AssetType::Image => "image",
            AssetType::Atlas => "atlas",
            AssetType::Text => "text",
            AssetType::BitmapFont => "bitmapFont",
            AssetType::AssetList => "assetList",
        }
    }

    /// Whether the asset has to be decoded after it is fetched
    pub fn is_audio(&self) -> bool {
        matches!(self, AssetType::Sound | AssetType::AudioSprite)
    }

    /// Whether the manifest key is a file name whose extension is stripped
    pub fn keyed_by_file_stem(&self) -> bool {
        matches!(self, AssetType::Image | AssetType::Text)
    }
}

/// Strip the last extension from a file name ("logo.png" -> "logo")
pub fn asset_key(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => file_name,
    }
}

/// Extension of a file name, if any
pub fn extension(file_name: &str) -> Option<&str> {
    file_name.rsplit_once('.').map(|(_, ext)| ext)
}

/// Resolved directory URLs for every asset kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    base_url: String,
    overrides: PathOverrides,
    asset_path: String,
    data_path: String,
    spritesheet_path: String,
    img_path: String,
    font_path: String,
    audio_sprite_path: String,
    sound_path: String,
    resolution: Resolution,
    platform: Platform,
}

impl AssetPaths {
    /// Create paths with every directory at its default under `base_url`
    pub fn new(base_url: &str) -> Self {
        let mut paths = Self {
            base_url: String::new(),
            overrides: PathOverrides::default(),
            asset_path: String::new(),
            data_path: String::new(),
            spritesheet_path: String::new(),
            img_path: String::new(),
            font_path: String::new(),
            audio_sprite_path: String::new(),
            sound_path: String::new(),
            resolution: Resolution::default(),
            platform: Platform::default(),
        };
        paths.set_base_url(base_url);
        paths
    }

    pub fn from_config(config: &LoaderConfig) -> Self {
        let mut paths = Self::new(&config.base_url);
        paths.resolution = config.resolution;
        paths.platform = config.platform;
        paths.set_paths(config.paths.clone());
        paths
    }

    /// Change the base URL, keeping any directory overrides
    pub fn set_base_url(&mut self, base_url: &str) {
        let mut base_url = base_url.to_string();
        if !base_url.is_empty() && !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self.rebuild();
    }

    /// Replace the directory overrides
    pub fn set_paths(&mut self, overrides: PathOverrides) {
        self.overrides = overrides;
        self.rebuild();
    }

    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.resolution = resolution;
    }

    pub fn set_platform(&mut self, platform: Platform) {
        self.platform = platform;
    }

    fn rebuild(&mut self) {
        let base = &self.base_url;
        let o = &self.overrides;
        let join = |value: &Option<String>, default: &str| {
            format!("{}{}", base, value.as_deref().unwrap_or(default))
        };

        self.asset_path = join(&o.asset_path, "assets");
        self.data_path = join(&o.data_path, "assets/data");
        self.spritesheet_path = join(&o.spritesheet_path, "assets/img/spritesheets");
        self.img_path = join(&o.img_path, "assets/img");
        self.font_path = join(&o.font_path, "assets/fonts");
        self.audio_sprite_path = join(&o.audio_sprite_path, "assets/audio/sprite");
        self.sound_path = join(&o.sound_path, "assets/audio/sound");
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn asset_path(&self) -> &str {
        &self.asset_path
    }

    pub fn data_path(&self) -> &str {
        &self.data_path
    }

    pub fn spritesheet_path(&self) -> &str {
        &self.spritesheet_path
    }

    pub fn img_path(&self) -> &str {
        &self.img_path
    }

    pub fn font_path(&self) -> &str {
        &self.font_path
    }

    pub fn audio_sprite_path(&self) -> &str {
        &self.audio_sprite_path
    }

    pub fn sound_path(&self) -> &str {
        &self.sound_path
    }

    /// URL of a standalone image; `file_name` keeps its extension
    pub fn image_url(&self, file_name: &str) -> String {
        let key = asset_key(file_name);
        match extension(file_name) {
            Some(ext) => format!("{}/{}{}.{}", self.img_path, key, self.resolution.suffix(), ext),
            None => format!("{}/{}{}", self.img_path, key, self.resolution.suffix()),
        }
    }

    /// Image and JSON hash URLs of a texture atlas
    pub fn atlas_urls(&self, key: &str) -> (String, String) {
        let stem = format!("{}/{}{}", self.spritesheet_path, key, self.resolution.suffix());
        (format!("{}.png", stem), format!("{}.json", stem))
    }

    /// Candidate URLs of a sound, one per extension
    pub fn sound_urls(&self, key: &str, extensions: &[String]) -> Vec<String> {
        self.audio_extensions(extensions)
            .iter()
            .map(|ext| format!("{}/{}.{}", self.sound_path, key, ext))
            .collect()
    }

    /// Candidate URLs of an audio sprite plus its marker JSON
    pub fn audio_sprite_urls(&self, key: &str, extensions: &[String]) -> (Vec<String>, String) {
        let urls = self
            .audio_extensions(extensions)
            .iter()
            .map(|ext| format!("{}/{}.{}", self.audio_sprite_path, key, ext))
            .collect();
        (urls, format!("{}/{}.json", self.audio_sprite_path, key))
    }

    /// URL of a text file relative to the data directory
    pub fn text_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.data_path, file_name)
    }

    /// Texture and descriptor URLs of a bitmap font
    pub fn bitmap_font_urls(&self, key: &str) -> (String, String) {
        (
            format!("{}/{}.png", self.font_path, key),
            format!("{}/{}.fnt", self.font_path, key),
        )
    }

    /// Requested extensions, with m4a put first on platforms that prefer it
    pub fn audio_extensions(&self, extensions: &[String]) -> Vec<String> {
        let mut exts = extensions.to_vec();
        if self.platform.prefers_m4a() && !exts.iter().any(|e| e == "m4a") {
            exts.insert(0, "m4a".to_string());
        }
        exts
    }
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self::new("")
    }
}
