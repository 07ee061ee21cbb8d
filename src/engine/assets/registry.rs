// Completion records and asset eviction

use super::catalog::{AssetDescriptor, Catalog};
use super::fetch::FetchEngine;
use super::loader::AssetType;
use crate::engine::audio::AudioSystem;
use std::collections::HashMap;

/// Which namespaces a clear is allowed to touch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearOptions {
    pub audio: bool,
    pub atlases: bool,
    pub images: bool,
    pub text: bool,
    pub fonts: bool,
}

impl ClearOptions {
    /// Clear everything that is not required
    pub fn all() -> Self {
        Self {
            audio: true,
            atlases: true,
            images: true,
            text: true,
            fonts: true,
        }
    }

    fn allows(&self, kind: AssetType) -> bool {
        match kind {
            AssetType::Sound | AssetType::AudioSprite => self.audio,
            AssetType::Atlas => self.atlases,
            AssetType::Image => self.images,
            AssetType::Text => self.text,
            AssetType::BitmapFont => self.fonts,
            AssetType::AssetList => true,
        }
    }
}

impl Default for ClearOptions {
    fn default() -> Self {
        Self::all()
    }
}

/// What a clear did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearReport {
    /// Keys removed from a cache
    pub evicted: Vec<String>,

    /// Keys left alone because they are required
    pub kept_required: Vec<String>,

    /// Nested or top-level lists skipped because they are required
    pub kept_lists: Vec<String>,
}

/// Tracks which asset lists finished loading, fetch and decode both
#[derive(Debug, Default)]
pub struct AssetRegistry {
    completed: HashMap<String, bool>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_loaded_assets(&self, id: &str) -> bool {
        self.completed.get(id).copied().unwrap_or(false)
    }

    /// Record a finished session. Returns false if the list was already complete.
    pub fn mark_complete(&mut self, id: &str) -> bool {
        let previous = self.completed.insert(id.to_string(), true);
        previous != Some(true)
    }

    pub fn mark_incomplete(&mut self, id: &str) {
        self.completed.insert(id.to_string(), false);
    }

    /// Ids currently marked complete, sorted
    pub fn loaded_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .completed
            .iter()
            .filter(|(_, done)| **done)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Evict a list's non-required assets and reset its completion record
    ///
    /// Nested lists are cleared too. Each list is visited once, so reference
    /// cycles terminate.
    pub fn clear_assets<F, A>(
        &mut self,
        catalog: &Catalog,
        id: &str,
        options: ClearOptions,
        engine: &mut F,
        audio: &mut A,
    ) -> ClearReport
    where
        F: FetchEngine + ?Sized,
        A: AudioSystem + ?Sized,
    {
        let mut report = ClearReport::default();
        let mut visited = Vec::new();
        self.clear_list(catalog, id, options, engine, audio, &mut visited, &mut report);
        report
    }

    #[allow(clippy::too_many_arguments)]
    fn clear_list<F, A>(
        &mut self,
        catalog: &Catalog,
        id: &str,
        options: ClearOptions,
        engine: &mut F,
        audio: &mut A,
        visited: &mut Vec<String>,
        report: &mut ClearReport,
    ) where
        F: FetchEngine + ?Sized,
        A: AudioSystem + ?Sized,
    {
        if visited.iter().any(|v| v == id) {
            return;
        }
        visited.push(id.to_string());

        let Some(list) = catalog.get(id) else {
            log::warn!("No asset list '{}' to clear", id);
            return;
        };
        if list.required {
            log::info!("The asset list '{}' is required and will not be cleared", id);
            report.kept_lists.push(id.to_string());
            return;
        }
        log::info!("Clearing asset list '{}'", id);

        for asset in &list.assets {
            // Covers list references too: a required reference keeps the whole sublist
            if asset.required {
                log::info!(
                    "The {} asset '{}' is required and will not be cleared",
                    asset.kind.manifest_name(),
                    asset.key
                );
                match asset.kind {
                    AssetType::AssetList => report.kept_lists.push(asset.key.clone()),
                    _ => report.kept_required.push(asset.key.clone()),
                }
                continue;
            }
            if asset.kind == AssetType::AssetList {
                self.clear_list(catalog, &asset.key, options, engine, audio, visited, report);
                continue;
            }
            if options.allows(asset.kind) && evict(asset, engine, audio) {
                report.evicted.push(asset.key.clone());
            }
        }

        self.mark_incomplete(id);
    }
}

fn evict<F, A>(asset: &AssetDescriptor, engine: &mut F, audio: &mut A) -> bool
where
    F: FetchEngine + ?Sized,
    A: AudioSystem + ?Sized,
{
    let key = asset.key.as_str();
    match asset.kind {
        AssetType::Sound | AssetType::AudioSprite => {
            let known = audio.remove_audio(key);
            engine.remove_sound(key) || known
        }
        AssetType::Image => engine.remove_image(key),
        AssetType::Atlas => engine.remove_atlas(key),
        AssetType::Text => engine.remove_text(key),
        AssetType::BitmapFont => engine.remove_bitmap_font(key),
        AssetType::AssetList => false,
    }
}
