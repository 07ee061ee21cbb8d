// Type-safe asset handle system

use std::fmt;
use std::marker::PhantomData;

/// Unique identifier for an asset key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetId(pub(crate) u64);

impl AssetId {
    /// Create a new asset ID from a cache key
    pub fn from_key(key: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        Self(hasher.finish())
    }

    /// Get the raw u64 value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Handle to an enqueued or cached asset
///
/// The `T` parameter is the cache namespace, so an image key and a sound key
/// with the same text are different handles.
pub struct AssetHandle<T> {
    id: AssetId,
    key: String,
    _phantom: PhantomData<T>,
}

impl<T> AssetHandle<T> {
    pub(crate) fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            id: AssetId::from_key(&key),
            key,
            _phantom: PhantomData,
        }
    }

    /// Get the underlying asset ID
    pub fn id(&self) -> AssetId {
        self.id
    }

    /// Cache key within the namespace
    pub fn key(&self) -> &str {
        &self.key
    }
}

// Manual impls so `T` needs no bounds
impl<T> Clone for AssetHandle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            key: self.key.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<T> PartialEq for AssetHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.key == other.key
    }
}

impl<T> Eq for AssetHandle<T> {}

impl<T> fmt::Debug for AssetHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetHandle").field("key", &self.key).finish()
    }
}

// Marker types for the cache namespaces
pub struct ImageAsset;
pub struct SoundAsset;
pub struct TextAsset;
pub struct FontAsset;

/// Convenience type aliases
pub type ImageHandle = AssetHandle<ImageAsset>;
pub type SoundHandle = AssetHandle<SoundAsset>;
pub type TextHandle = AssetHandle<TextAsset>;
pub type FontHandle = AssetHandle<FontAsset>;
