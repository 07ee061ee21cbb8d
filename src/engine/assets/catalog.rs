// Asset catalog: manifest parsing and list expansion

use super::loader::{asset_key, AssetType};
use super::AssetError;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};

/// One loadable unit from a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    pub kind: AssetType,

    /// Cache key within the kind's namespace (the list id for `AssetList`)
    pub key: String,

    /// File name or key as written in the manifest
    pub url: String,

    /// Audio extensions in preference order
    pub extensions: Vec<String>,

    /// Required assets are never evicted by a clear
    pub required: bool,
}

impl AssetDescriptor {
    /// Build a descriptor the way the manifest parser does, deriving the key from `url`
    pub fn new(kind: AssetType, url: impl Into<String>) -> Self {
        let url = url.into();
        let key = if kind.keyed_by_file_stem() {
            asset_key(&url).to_string()
        } else {
            url.clone()
        };
        Self {
            kind,
            key,
            url,
            extensions: Vec::new(),
            required: false,
        }
    }

    pub fn image(file_name: &str) -> Self {
        Self::new(AssetType::Image, file_name)
    }

    pub fn atlas(key: &str) -> Self {
        Self::new(AssetType::Atlas, key)
    }

    pub fn sound(key: &str, extensions: &[&str]) -> Self {
        Self::new(AssetType::Sound, key).with_extensions(extensions)
    }

    pub fn audio_sprite(key: &str, extensions: &[&str]) -> Self {
        Self::new(AssetType::AudioSprite, key).with_extensions(extensions)
    }

    pub fn text(file_name: &str) -> Self {
        Self::new(AssetType::Text, file_name)
    }

    pub fn bitmap_font(key: &str) -> Self {
        Self::new(AssetType::BitmapFont, key)
    }

    pub fn list_ref(list_id: &str) -> Self {
        Self::new(AssetType::AssetList, list_id)
    }

    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Reject descriptors the fetch engine could not act on
    pub fn validate(&self) -> Result<(), AssetError> {
        if self.key.is_empty() {
            return Err(AssetError::InvalidAssetDescriptor {
                key: self.url.clone(),
                reason: "empty key".to_string(),
            });
        }
        if self.kind.is_audio() && self.extensions.is_empty() {
            return Err(AssetError::InvalidAssetDescriptor {
                key: self.key.clone(),
                reason: format!("{} has no extensions", self.kind.manifest_name()),
            });
        }
        Ok(())
    }
}

/// A named, ordered group of assets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetList {
    pub id: String,
    pub assets: Vec<AssetDescriptor>,
    pub autoload: bool,

    /// A required list is never cleared
    pub required: bool,
}

/// Extensions may be written as "ogg,mp3" or ["ogg", "mp3"]
#[derive(Deserialize)]
#[serde(untagged)]
enum RawExtensions {
    Joined(String),
    List(Vec<String>),
}

impl RawExtensions {
    fn into_vec(self) -> Vec<String> {
        let list = match self {
            RawExtensions::Joined(joined) => joined.split(',').map(str::to_string).collect(),
            RawExtensions::List(list) => list,
        };
        list.into_iter()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .collect()
    }
}

#[derive(Deserialize)]
struct RawAsset {
    #[serde(rename = "type")]
    kind: AssetType,
    key: Option<String>,
    url: Option<String>,
    id: Option<String>,
    extensions: Option<RawExtensions>,
    #[serde(default)]
    required: bool,
}

#[derive(Deserialize)]
struct RawList {
    #[serde(default)]
    required: bool,
    // Older manifests carry the misspelled key
    #[serde(default, alias = "audtoload")]
    autoload: bool,
    assets: Vec<RawAsset>,
}

impl RawAsset {
    fn into_descriptor(self, list_id: &str, index: usize) -> Result<AssetDescriptor, AssetError> {
        let source = match self.kind {
            AssetType::AssetList => self.id.or(self.key),
            _ => self.url.or(self.key),
        };
        let source = source.ok_or_else(|| {
            AssetError::ManifestParse(format!(
                "{}[{}]: {} entry has no {}",
                list_id,
                index,
                self.kind.manifest_name(),
                if self.kind == AssetType::AssetList {
                    "id"
                } else {
                    "key or url"
                }
            ))
        })?;

        let mut descriptor = AssetDescriptor::new(self.kind, source);
        descriptor.extensions = self
            .extensions
            .map(RawExtensions::into_vec)
            .unwrap_or_default();
        descriptor.required = self.required;
        Ok(descriptor)
    }
}

/// Every asset list of a manifest, keyed by list id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    lists: BTreeMap<String, AssetList>,
}

impl Catalog {
    /// Parse a JSON manifest
    pub fn parse(manifest: &str) -> Result<Self, AssetError> {
        let raw: BTreeMap<String, RawList> =
            serde_json::from_str(manifest).map_err(|e| AssetError::ManifestParse(e.to_string()))?;

        let mut lists = BTreeMap::new();
        for (id, raw_list) in raw {
            let assets = raw_list
                .assets
                .into_iter()
                .enumerate()
                .map(|(i, asset)| asset.into_descriptor(&id, i))
                .collect::<Result<Vec<_>, _>>()?;

            lists.insert(
                id.clone(),
                AssetList {
                    id,
                    assets,
                    autoload: raw_list.autoload,
                    required: raw_list.required,
                },
            );
        }

        Ok(Self { lists })
    }

    /// Add or replace a single list
    pub fn insert(&mut self, list: AssetList) {
        self.lists.insert(list.id.clone(), list);
    }

    pub fn get(&self, id: &str) -> Option<&AssetList> {
        self.lists.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lists.contains_key(id)
    }

    pub fn lists(&self) -> impl Iterator<Item = &AssetList> {
        self.lists.values()
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Ids of the lists flagged for background prefetch
    pub fn autoload_ids(&self) -> Vec<String> {
        self.lists
            .values()
            .filter(|l| l.autoload)
            .map(|l| l.id.clone())
            .collect()
    }

    /// Flatten a list and its nested list references in declaration order
    ///
    /// Each sublist contributes its assets once, at its first reference. Nested
    /// references to unknown lists are skipped with a warning. A list that
    /// reaches itself again is an error.
    pub fn expand(&self, id: &str) -> Result<Vec<&AssetDescriptor>, AssetError> {
        if !self.contains(id) {
            return Err(AssetError::UnknownAssetList(id.to_string()));
        }
        let mut out = Vec::new();
        let mut stack = Vec::new();
        let mut expanded = HashSet::new();
        self.expand_into(id, &mut stack, &mut expanded, &mut out)?;
        Ok(out)
    }

    fn expand_into<'a>(
        &'a self,
        id: &str,
        stack: &mut Vec<String>,
        expanded: &mut HashSet<&'a str>,
        out: &mut Vec<&'a AssetDescriptor>,
    ) -> Result<(), AssetError> {
        if stack.iter().any(|s| s == id) {
            let mut chain = stack.clone();
            chain.push(id.to_string());
            return Err(AssetError::AssetListCycle(chain.join(" -> ")));
        }

        let Some((list_id, list)) = self.lists.get_key_value(id) else {
            log::warn!("Nested asset list '{}' is not in the manifest, skipping", id);
            return Ok(());
        };
        if expanded.contains(list_id.as_str()) {
            return Ok(());
        }

        stack.push(id.to_string());
        for asset in &list.assets {
            match asset.kind {
                AssetType::AssetList => self.expand_into(&asset.key, stack, expanded, out)?,
                _ => out.push(asset),
            }
        }
        stack.pop();
        expanded.insert(list_id.as_str());

        Ok(())
    }
}
