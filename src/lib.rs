//! Manifest-driven asset loading
//!
//! An [`AssetManager`] turns named lists from a JSON manifest into load
//! sessions. Files go to a [`FetchEngine`], sounds are tracked until the
//! [`AudioSystem`] has decoded them, and progress is reported through
//! [`LoadSignals`] with room reserved for decoding.

pub mod engine;

pub use engine::assets::{
    AssetDescriptor, AssetError, AssetHandle, AssetList, AssetManager, AssetPaths, AssetType,
    Catalog, ClearOptions, ClearReport, FetchEngine, FetchEvent, FetchEventKind, FetchRequest,
    LoadOutcome, LoaderConfig, MemoryFetchEngine, Namespace,
};
pub use engine::audio::{AudioSystem, DecodeEvent, MemoryAudio};
pub use engine::events::{BatchId, FileProgress, LoadSignals, SessionKind, Signal, Subscription};
