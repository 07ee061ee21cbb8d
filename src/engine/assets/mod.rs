// Asset loading system
//
// Turns a manifest of asset lists into load sessions: assets are queued on a
// fetch engine, sounds are tracked until the audio system has decoded them, and
// progress is reported on the game or background signals.

mod catalog;
mod config;
mod decode;
mod fetch;
mod handle;
mod loader;
mod manager;
mod progress;
mod registry;

pub use catalog::{AssetDescriptor, AssetList, Catalog};
pub use config::{
    LoaderConfig, PathOverrides, Platform, Resolution, DEFAULT_DECODE_MODIFIER,
    DEFAULT_DECODE_TIMEOUT_MS,
};
pub use decode::{DecodeJob, DecodeOutcome, DecodeWaiter};
pub use fetch::{
    FetchEngine, FetchEvent, FetchEventKind, FetchRequest, MemoryFetchEngine, Namespace,
};
pub use handle::{
    AssetHandle, AssetId, FontAsset, FontHandle, ImageAsset, ImageHandle, SoundAsset, SoundHandle,
    TextAsset, TextHandle,
};
pub use loader::{asset_key, AssetPaths, AssetType};
pub use manager::{AssetManager, LoadOutcome};
pub use progress::ProgressTracker;
pub use registry::{AssetRegistry, ClearOptions, ClearReport};

/// Asset loading errors
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Malformed asset manifest: {0}")]
    ManifestParse(String),

    #[error("Unknown asset list: {0}")]
    UnknownAssetList(String),

    #[error("Invalid asset descriptor '{key}': {reason}")]
    InvalidAssetDescriptor { key: String, reason: String },

    #[error("Asset list references itself: {0}")]
    AssetListCycle(String),

    #[error("Timed out waiting for {session} to decode: {}", .pending.join(", "))]
    DecodeTimeout {
        session: String,
        pending: Vec<String>,
    },

    #[error("Invalid loader config: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
