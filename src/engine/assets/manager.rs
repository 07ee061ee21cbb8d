// Central asset loading coordinator

use super::catalog::{AssetDescriptor, Catalog};
use super::config::LoaderConfig;
use super::decode::{DecodeOutcome, DecodeWaiter};
use super::fetch::{FetchEngine, FetchEvent, FetchEventKind};
use super::handle::{AssetHandle, FontHandle, ImageHandle, SoundHandle, TextHandle};
use super::loader::{asset_key, AssetPaths, AssetType};
use super::progress::ProgressTracker;
use super::registry::{AssetRegistry, ClearOptions, ClearReport};
use super::AssetError;
use crate::engine::audio::{AudioSystem, DecodeEvent};
use crate::engine::events::{BatchId, FileProgress, LoadSignals, SessionKind};
use crossbeam_channel::{Receiver, Sender};
use std::time::Instant;

/// What a load request did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Files were handed to the fetch engine; completion arrives through `update`
    Started {
        batch: BatchId,
        files: usize,
        sounds: usize,
    },
    /// Nothing needed fetching; every event has already been dispatched
    Completed,
    /// The list id is not in the manifest
    UnknownList,
    /// `load_queue` is still running from an earlier call
    AlreadyLoading,
    /// Another session is still in flight, so the queue was not started
    Busy,
}

/// The live state of one load request
struct LoadSession {
    /// Lists marked complete when the session finishes
    lists: Vec<String>,
    kind: SessionKind,
    batch: BatchId,
    total_files: usize,
    decode: DecodeWaiter,
    is_queue: bool,
}

impl LoadSession {
    fn label(&self) -> String {
        if self.lists.is_empty() {
            format!("batch {}", self.batch.0)
        } else {
            self.lists.join(", ")
        }
    }
}

/// Asset manager for the game
///
/// Owns the manifest, the collaborators and the single active session. Starting
/// a new load detaches the previous session: its transfers still finish inside
/// the fetch engine, but their events are dropped here.
///
/// Nothing happens in the background. Call [`AssetManager::update`] every frame
/// to pump fetch and decode notifications into the signals.
pub struct AssetManager<F: FetchEngine, A: AudioSystem> {
    config: LoaderConfig,
    paths: AssetPaths,
    engine: F,
    audio: A,
    catalog: Catalog,
    registry: AssetRegistry,
    progress: ProgressTracker,

    /// Game-facing signals
    signals: LoadSignals,

    /// Signals for background prefetches
    background_signals: LoadSignals,

    session: Option<LoadSession>,

    /// Sounds queued since the last session started
    staged: DecodeWaiter,

    /// Sounds still decoding when the last session timed out
    abandoned: Vec<String>,

    next_batch: BatchId,
    queue_in_flight: bool,

    fetch_tx: Sender<FetchEvent>,
    fetch_rx: Receiver<FetchEvent>,
    decode_tx: Sender<DecodeEvent>,
    decode_rx: Receiver<DecodeEvent>,
}

impl<F: FetchEngine, A: AudioSystem> AssetManager<F, A> {
    /// Create a new asset manager with an empty catalog
    pub fn new(config: LoaderConfig, engine: F, audio: A) -> Self {
        let (fetch_tx, fetch_rx) = crossbeam_channel::unbounded();
        let (decode_tx, decode_rx) = crossbeam_channel::unbounded();

        Self {
            paths: AssetPaths::from_config(&config),
            progress: ProgressTracker::new(config.decode_modifier),
            config,
            engine,
            audio,
            catalog: Catalog::default(),
            registry: AssetRegistry::new(),
            signals: LoadSignals::new(),
            background_signals: LoadSignals::new(),
            session: None,
            staged: DecodeWaiter::new(),
            abandoned: Vec::new(),
            next_batch: BatchId(1),
            queue_in_flight: false,
            fetch_tx,
            fetch_rx,
            decode_tx,
            decode_rx,
        }
    }

    /// Replace the catalog with the lists of a JSON manifest
    pub fn set_data(&mut self, manifest: &str) -> Result<(), AssetError> {
        let catalog = Catalog::parse(manifest)?;
        log::info!("Loaded asset manifest with {} lists", catalog.len());
        self.catalog = catalog;
        Ok(())
    }

    pub fn set_catalog(&mut self, catalog: Catalog) {
        self.catalog = catalog;
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn paths(&self) -> &AssetPaths {
        &self.paths
    }

    pub fn paths_mut(&mut self) -> &mut AssetPaths {
        &mut self.paths
    }

    pub fn fetch_engine(&self) -> &F {
        &self.engine
    }

    pub fn fetch_engine_mut(&mut self) -> &mut F {
        &mut self.engine
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }

    /// Signals of game-facing loads
    pub fn signals_mut(&mut self) -> &mut LoadSignals {
        &mut self.signals
    }

    /// Signals of background loads
    pub fn background_signals_mut(&mut self) -> &mut LoadSignals {
        &mut self.background_signals
    }

    fn signals_for(&mut self, kind: SessionKind) -> &mut LoadSignals {
        match kind {
            SessionKind::Game => &mut self.signals,
            SessionKind::Background => &mut self.background_signals,
        }
    }

    /// Set the share of the progress bar reserved per sound, from the next session on
    pub fn set_sound_decoding_modifier(&mut self, modifier: f32) {
        self.progress.set_modifier(modifier);
    }

    pub fn sound_decoding_modifier(&self) -> f32 {
        self.progress.modifier()
    }

    /// Current progress ceiling of the active session
    pub fn max_percent(&self) -> f32 {
        self.progress.max_percent()
    }

    /// Scale raw fetch progress by the current ceiling
    pub fn get_load_progress(&self, raw: f32) -> f32 {
        self.progress.adjust(raw)
    }

    /// Whether the active session has no decodes outstanding
    ///
    /// Stays false after a decode timeout until the next session starts.
    pub fn all_sounds_decoded(&self) -> bool {
        match &self.session {
            Some(session) => session.decode.is_drained(),
            None => self.abandoned.is_empty(),
        }
    }

    /// Sounds the last timed out session gave up on
    pub fn abandoned_sounds(&self) -> &[String] {
        &self.abandoned
    }

    pub fn has_loaded_assets(&self, id: &str) -> bool {
        self.registry.has_loaded_assets(id)
    }

    pub fn is_loading(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_loading_queue(&self) -> bool {
        self.queue_in_flight
    }

    /// Lists the active session will mark complete
    pub fn current_lists(&self) -> &[String] {
        self.session
            .as_ref()
            .map_or(&[][..], |session| session.lists.as_slice())
    }

    /// Queue an image; `file_name` keeps its extension and the key drops it
    pub fn load_image(&mut self, file_name: &str) -> ImageHandle {
        let key = asset_key(file_name);
        if self.engine.has_image(key) {
            log::debug!("Image '{}' already cached", key);
        } else {
            let url = self.paths.image_url(file_name);
            self.engine.enqueue_image(key, &url);
        }
        AssetHandle::new(key)
    }

    /// Queue a texture atlas and its JSON hash
    pub fn load_atlas(&mut self, key: &str) -> ImageHandle {
        if self.engine.has_image(key) {
            log::debug!("Atlas '{}' already cached", key);
        } else {
            let (image_url, json_url) = self.paths.atlas_urls(key);
            self.engine.enqueue_atlas(key, &image_url, &json_url);
        }
        AssetHandle::new(key)
    }

    pub fn load_sound(&mut self, key: &str, extensions: &[String]) -> Result<SoundHandle, AssetError> {
        self.load_audio(key, extensions, false)
    }

    pub fn load_audio_sprite(
        &mut self,
        key: &str,
        extensions: &[String],
    ) -> Result<SoundHandle, AssetError> {
        self.load_audio(key, extensions, true)
    }

    /// Queue a sound or audio sprite, and expect it to decode once fetched
    pub fn load_audio(
        &mut self,
        key: &str,
        extensions: &[String],
        is_audio_sprite: bool,
    ) -> Result<SoundHandle, AssetError> {
        if extensions.is_empty() {
            return Err(AssetError::InvalidAssetDescriptor {
                key: key.to_string(),
                reason: "no audio extensions".to_string(),
            });
        }

        if self.engine.has_sound(key) && self.audio.is_decoded(key) {
            log::debug!("Sound '{}' already decoded", key);
            return Ok(AssetHandle::new(key));
        }

        if is_audio_sprite {
            let (urls, json_url) = self.paths.audio_sprite_urls(key, extensions);
            self.engine.enqueue_audio_sprite(key, urls, &json_url);
        } else {
            let urls = self.paths.sound_urls(key, extensions);
            self.engine.enqueue_audio(key, urls);
        }
        self.staged.expect(key, is_audio_sprite);

        Ok(AssetHandle::new(key))
    }

    /// Queue a text file from the data directory; text is never served from cache
    pub fn load_text(&mut self, file_name: &str) -> TextHandle {
        let key = asset_key(file_name);
        let url = self.paths.text_url(file_name);
        self.engine.enqueue_text(key, &url);
        AssetHandle::new(key)
    }

    /// Queue a bitmap font texture and its descriptor
    pub fn load_bitmap_font(&mut self, key: &str) -> FontHandle {
        if self.engine.has_bitmap_font(key) {
            log::debug!("Bitmap font '{}' already cached", key);
        } else {
            let (texture_url, descriptor_url) = self.paths.bitmap_font_urls(key);
            self.engine.enqueue_bitmap_font(key, &texture_url, &descriptor_url);
        }
        AssetHandle::new(key)
    }

    fn load_descriptor(&mut self, asset: &AssetDescriptor) -> Result<(), AssetError> {
        match asset.kind {
            AssetType::Image => {
                self.load_image(&asset.url);
            }
            AssetType::Atlas => {
                self.load_atlas(&asset.key);
            }
            AssetType::Sound => {
                self.load_sound(&asset.key, &asset.extensions)?;
            }
            AssetType::AudioSprite => {
                self.load_audio_sprite(&asset.key, &asset.extensions)?;
            }
            AssetType::Text => {
                self.load_text(&asset.url);
            }
            AssetType::BitmapFont => {
                self.load_bitmap_font(&asset.key);
            }
            // Expanded by the catalog before we get here
            AssetType::AssetList => {}
        }
        Ok(())
    }

    /// Flatten, validate and queue lists. Nothing is queued if any descriptor is bad.
    fn queue_lists(&mut self, ids: &[String]) -> Result<(), AssetError> {
        let mut assets: Vec<AssetDescriptor> = Vec::new();
        for id in ids {
            assets.extend(self.catalog.expand(id)?.into_iter().cloned());
        }
        for asset in &assets {
            asset.validate()?;
        }
        for asset in &assets {
            self.load_descriptor(asset)?;
        }
        Ok(())
    }

    fn detach_session(&mut self) {
        if let Some(old) = self.session.take() {
            log::info!("Detaching unfinished load of {}", old.label());
            if old.is_queue {
                self.queue_in_flight = false;
            }
        }
    }

    /// Load every asset of a list, replacing whatever session was running
    pub fn load_assets(&mut self, id: &str, background: bool) -> Result<LoadOutcome, AssetError> {
        self.detach_session();
        self.engine.reset();
        self.staged = DecodeWaiter::new();

        if !self.catalog.contains(id) {
            log::warn!("No preload data registered for '{}'", id);
            return Ok(LoadOutcome::UnknownList);
        }

        let ids = vec![id.to_string()];
        if let Err(err) = self.queue_lists(&ids) {
            self.engine.reset();
            self.staged = DecodeWaiter::new();
            return Err(err);
        }

        Ok(self.begin_session(ids, SessionKind::from_background(background), false))
    }

    /// Prefetch every autoload list in the background
    ///
    /// Does nothing while an earlier queue is still running, and refuses to
    /// interrupt another session.
    pub fn load_queue(&mut self) -> Result<LoadOutcome, AssetError> {
        if self.queue_in_flight {
            log::debug!("Preload queue already running");
            return Ok(LoadOutcome::AlreadyLoading);
        }
        if let Some(session) = &self.session {
            log::info!("Not starting preload queue while {} is loading", session.label());
            return Ok(LoadOutcome::Busy);
        }

        let ids = self.catalog.autoload_ids();
        if ids.is_empty() {
            log::info!("No preload queue to load");
        }

        self.engine.reset();
        self.staged = DecodeWaiter::new();
        if let Err(err) = self.queue_lists(&ids) {
            self.engine.reset();
            self.staged = DecodeWaiter::new();
            return Err(err);
        }

        self.queue_in_flight = true;
        Ok(self.begin_session(ids, SessionKind::Background, true))
    }

    /// Start whatever was queued with the `load_*` calls as an unnamed session
    pub fn start(&mut self, background: bool) -> LoadOutcome {
        self.detach_session();
        self.begin_session(Vec::new(), SessionKind::from_background(background), false)
    }

    fn begin_session(&mut self, lists: Vec<String>, kind: SessionKind, is_queue: bool) -> LoadOutcome {
        let batch = self.next_batch;
        self.next_batch = batch.next();

        let decode = std::mem::take(&mut self.staged);
        self.abandoned.clear();
        let files = self.engine.queued_len();
        let sounds = decode.pending_len();
        self.progress.begin(sounds);

        self.session = Some(LoadSession {
            lists,
            kind,
            batch,
            total_files: files,
            decode,
            is_queue,
        });

        if files == 0 {
            // Everything was cached; play the whole sequence now
            log::info!("Nothing to fetch for batch {}, completing immediately", batch.0);
            let progress = self.progress.adjust(100.0);
            let signals = self.signals_for(kind);
            signals.load_start.dispatch(&());
            signals.file_complete.dispatch(&FileProgress {
                progress,
                key: None,
                file_index: 0,
                total_files: 0,
            });
            self.finish_fetch(Instant::now());
            return LoadOutcome::Completed;
        }

        log::info!(
            "Starting {:?} batch {}: {} files, {} sounds to decode",
            kind,
            batch.0,
            files,
            sounds
        );
        self.engine.start(batch, self.fetch_tx.clone());
        LoadOutcome::Started {
            batch,
            files,
            sounds,
        }
    }

    /// Pump collaborator notifications into the signals
    pub fn update(&mut self) -> Result<(), AssetError> {
        self.update_at(Instant::now())
    }

    /// Same as [`AssetManager::update`] with an explicit clock for the decode timeout
    pub fn update_at(&mut self, now: Instant) -> Result<(), AssetError> {
        while let Ok(event) = self.fetch_rx.try_recv() {
            log::debug!("handle fetch event {:?}", event);
            self.handle_fetch_event(event, now);
        }
        while let Ok(event) = self.decode_rx.try_recv() {
            log::debug!("handle decode event {:?}", event);
            self.handle_decode_event(event);
        }
        self.check_decode_timeout(now)
    }

    fn is_current(&self, batch: BatchId) -> bool {
        match &self.session {
            Some(session) if session.batch == batch => true,
            _ => {
                log::debug!("Dropping event of detached batch {}", batch.0);
                false
            }
        }
    }

    fn handle_fetch_event(&mut self, event: FetchEvent, now: Instant) {
        if !self.is_current(event.batch) {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let kind = session.kind;

        match event.kind {
            FetchEventKind::LoadStart => self.signals_for(kind).load_start.dispatch(&()),
            FetchEventKind::FileStart { key } => {
                // Background loads only report completions
                if kind == SessionKind::Game {
                    self.signals.file_start.dispatch(&key);
                }
            }
            FetchEventKind::FileComplete {
                progress,
                key,
                file_index,
                total_files,
            } => {
                if let Some(job) = session.decode.on_fetched(&key) {
                    self.audio.watch_decode(
                        &job.key,
                        job.is_audio_sprite,
                        event.batch,
                        self.decode_tx.clone(),
                    );
                }
                let progress = self.progress.adjust(progress);
                self.signals_for(kind).file_complete.dispatch(&FileProgress {
                    progress,
                    key: Some(key),
                    file_index,
                    total_files,
                });
            }
            FetchEventKind::LoadComplete => self.finish_fetch(now),
        }
    }

    /// Raw fetching is over: report it, then wait for (or finish) decoding
    fn finish_fetch(&mut self, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let kind = session.kind;
        let batch = session.batch;
        let early = session.decode.fetch_completed(now);

        for job in session.decode.unwatched() {
            self.audio
                .watch_decode(&job.key, job.is_audio_sprite, batch, self.decode_tx.clone());
        }

        log::info!("Fetch complete for batch {}", batch.0);
        self.signals_for(kind).load_complete.dispatch(&());

        for key in early {
            self.apply_decode(&key);
        }
        self.complete_if_drained();
    }

    fn handle_decode_event(&mut self, event: DecodeEvent) {
        if self.is_current(event.batch) {
            self.apply_decode(&event.key);
        }
    }

    fn apply_decode(&mut self, key: &str) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match session.decode.on_decoded(key) {
            DecodeOutcome::Deferred => log::debug!("'{}' decoded before its fetch finished", key),
            DecodeOutcome::Ignored => log::debug!("Ignoring decode of '{}'", key),
            DecodeOutcome::Decoded { job, .. } => {
                let kind = session.kind;
                let total_files = session.total_files;

                self.audio
                    .register_decoded_audio(&job.key, job.is_audio_sprite);
                self.progress.sound_decoded();

                let progress = self.progress.adjust(100.0);
                self.signals_for(kind).file_complete.dispatch(&FileProgress {
                    progress,
                    key: Some(job.key),
                    file_index: total_files,
                    total_files,
                });
                self.complete_if_drained();
            }
        }
    }

    fn complete_if_drained(&mut self) {
        let ready = self.session.as_ref().map_or(false, |session| {
            session.decode.is_fetch_complete() && session.decode.is_drained()
        });
        if !ready {
            return;
        }
        let Some(session) = self.session.take() else {
            return;
        };

        for id in &session.lists {
            self.registry.mark_complete(id);
        }
        if session.is_queue {
            self.queue_in_flight = false;
        }

        log::info!("Loaded and decoded {}", session.label());
        self.signals_for(session.kind)
            .load_complete_and_audio_decoded
            .dispatch(&());
    }

    fn check_decode_timeout(&mut self, now: Instant) -> Result<(), AssetError> {
        let Some(timeout) = self.config.decode_timeout() else {
            return Ok(());
        };
        let expired = self
            .session
            .as_ref()
            .map_or(false, |session| session.decode.timed_out(now, timeout));
        if !expired {
            return Ok(());
        }
        let Some(session) = self.session.take() else {
            return Ok(());
        };

        if session.is_queue {
            self.queue_in_flight = false;
        }
        let pending = session.decode.pending_keys();
        self.abandoned = pending.clone();
        self.progress.begin(0);
        log::warn!(
            "Gave up on {} after {:?}, still decoding: {:?}",
            session.label(),
            timeout,
            pending
        );
        Err(AssetError::DecodeTimeout {
            session: session.label(),
            pending,
        })
    }

    /// Evict a list's non-required assets and mark it as not loaded
    pub fn clear_assets(&mut self, id: &str, options: ClearOptions) -> ClearReport {
        self.registry.clear_assets(
            &self.catalog,
            id,
            options,
            &mut self.engine,
            &mut self.audio,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::assets::catalog::AssetList;
    use crate::engine::assets::fetch::{FetchRequest, MemoryFetchEngine, Namespace};
    use crate::engine::audio::MemoryAudio;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    type TestManager = AssetManager<MemoryFetchEngine, MemoryAudio>;

    #[derive(Debug, Clone, PartialEq)]
    enum Seen {
        Start,
        FileStart(String),
        File(f32),
        Complete,
        Decoded,
    }

    fn manager() -> TestManager {
        AssetManager::new(
            LoaderConfig::default(),
            MemoryFetchEngine::new(),
            MemoryAudio::new(),
        )
    }

    fn record(signals: &mut LoadSignals) -> Rc<RefCell<Vec<Seen>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        signals.load_start.subscribe(move |_| s.borrow_mut().push(Seen::Start));
        let s = seen.clone();
        signals
            .file_start
            .subscribe(move |key| s.borrow_mut().push(Seen::FileStart(key.clone())));
        let s = seen.clone();
        signals
            .file_complete
            .subscribe(move |p| s.borrow_mut().push(Seen::File(p.progress)));
        let s = seen.clone();
        signals.load_complete.subscribe(move |_| s.borrow_mut().push(Seen::Complete));
        let s = seen.clone();
        signals
            .load_complete_and_audio_decoded
            .subscribe(move |_| s.borrow_mut().push(Seen::Decoded));
        seen
    }

    fn count(seen: &Rc<RefCell<Vec<Seen>>>, wanted: &Seen) -> usize {
        seen.borrow().iter().filter(|s| *s == wanted).count()
    }

    fn add_list(manager: &mut TestManager, id: &str, assets: Vec<AssetDescriptor>) {
        let mut catalog = manager.catalog().clone();
        catalog.insert(AssetList {
            id: id.to_string(),
            assets,
            autoload: false,
            required: false,
        });
        manager.set_catalog(catalog);
    }

    #[test]
    fn test_empty_list_completes_synchronously() {
        let mut manager = manager();
        add_list(&mut manager, "empty", Vec::new());
        let seen = record(manager.signals_mut());

        let outcome = manager.load_assets("empty", false).unwrap();

        assert_eq!(outcome, LoadOutcome::Completed);
        assert!(manager.has_loaded_assets("empty"));
        assert_eq!(
            *seen.borrow(),
            vec![Seen::Start, Seen::File(100.0), Seen::Complete, Seen::Decoded]
        );
        assert!(!manager.is_loading());
    }

    #[test]
    fn test_unknown_list_is_a_no_op() {
        let mut manager = manager();
        let seen = record(manager.signals_mut());

        let outcome = manager.load_assets("nope", false).unwrap();

        assert_eq!(outcome, LoadOutcome::UnknownList);
        assert!(seen.borrow().is_empty());
        assert!(!manager.has_loaded_assets("nope"));
    }

    #[test]
    fn test_three_sounds_progress() {
        let mut manager = manager();
        add_list(
            &mut manager,
            "music",
            vec![
                AssetDescriptor::sound("a", &["ogg"]),
                AssetDescriptor::sound("b", &["ogg"]),
                AssetDescriptor::sound("c", &["ogg"]),
            ],
        );
        let seen = record(manager.signals_mut());

        let outcome = manager.load_assets("music", false).unwrap();
        assert!(matches!(outcome, LoadOutcome::Started { files: 3, sounds: 3, .. }));
        assert_relative_eq!(manager.max_percent(), 94.0);

        manager.fetch_engine_mut().complete_all();
        manager.update().unwrap();
        assert_eq!(count(&seen, &Seen::Complete), 1);
        assert!(!manager.has_loaded_assets("music"), "Decodes still pending");
        assert!(!manager.all_sounds_decoded());
        assert_relative_eq!(manager.get_load_progress(100.0), 94.0);

        manager.audio_mut().decode_all();
        manager.update().unwrap();

        assert_relative_eq!(manager.max_percent(), 100.0);
        assert!(manager.has_loaded_assets("music"));
        assert_eq!(count(&seen, &Seen::Decoded), 1);
        assert_eq!(seen.borrow().last(), Some(&Seen::Decoded));
        assert_eq!(manager.audio().registered().len(), 3);
    }

    #[test]
    fn test_event_order() {
        let mut manager = manager();
        add_list(
            &mut manager,
            "level",
            vec![
                AssetDescriptor::image("bg.png"),
                AssetDescriptor::sound("music", &["ogg"]),
            ],
        );
        let seen = record(manager.signals_mut());

        manager.load_assets("level", false).unwrap();
        manager.fetch_engine_mut().complete_all();
        manager.update().unwrap();
        manager.audio_mut().decode("music");
        manager.update().unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![
                Seen::Start,
                Seen::FileStart("bg".to_string()),
                Seen::File(49.0),
                Seen::FileStart("music".to_string()),
                Seen::File(98.0),
                Seen::Complete,
                Seen::File(100.0),
                Seen::Decoded,
            ]
        );
    }

    fn decode_in_order(order: &[&str]) -> (f32, usize, Vec<(String, bool)>) {
        let mut manager = manager();
        add_list(
            &mut manager,
            "sfx",
            vec![
                AssetDescriptor::sound("a", &["ogg"]),
                AssetDescriptor::audio_sprite("b", &["ogg"]),
                AssetDescriptor::sound("c", &["ogg"]),
            ],
        );
        let seen = record(manager.signals_mut());

        manager.load_assets("sfx", false).unwrap();
        manager.fetch_engine_mut().complete_all();
        manager.update().unwrap();
        for key in order {
            manager.audio_mut().decode(key);
            manager.update().unwrap();
        }

        let mut registered = manager.audio().registered().to_vec();
        registered.sort();
        (manager.max_percent(), count(&seen, &Seen::Decoded), registered)
    }

    #[test]
    fn test_decode_order_independence() {
        let forward = decode_in_order(&["a", "b", "c"]);
        let reverse = decode_in_order(&["c", "b", "a"]);

        assert_relative_eq!(forward.0, 100.0);
        assert_eq!(forward.1, 1);
        assert_eq!(forward, reverse);
        assert!(forward.2.contains(&("b".to_string(), true)));
    }

    #[test]
    fn test_decode_before_fetch_complete_is_deferred() {
        let mut manager = manager();
        add_list(
            &mut manager,
            "level",
            vec![
                AssetDescriptor::sound("music", &["ogg"]),
                AssetDescriptor::image("bg.png"),
            ],
        );
        let seen = record(manager.signals_mut());

        manager.load_assets("level", false).unwrap();
        manager.fetch_engine_mut().complete_next();
        manager.update().unwrap();

        // Decoded while the image is still in flight
        manager.audio_mut().decode("music");
        manager.update().unwrap();
        assert_eq!(count(&seen, &Seen::Decoded), 0);

        manager.fetch_engine_mut().complete_next();
        manager.update().unwrap();

        let seen = seen.borrow();
        let complete = seen.iter().position(|s| *s == Seen::Complete).unwrap();
        let decoded = seen.iter().position(|s| *s == Seen::Decoded).unwrap();
        assert!(complete < decoded);
        assert_eq!(seen[complete + 1], Seen::File(100.0));
        assert!(manager.has_loaded_assets("level"));
    }

    #[test]
    fn test_duplicate_image_key_fetched_once() {
        let mut manager = manager();
        let first = manager.load_image("logo.png");
        let second = manager.load_image("logo.png");

        assert_eq!(first, second);
        assert_eq!(first.key(), "logo");
        assert_eq!(manager.fetch_engine().history().len(), 1);
    }

    #[test]
    fn test_duplicate_image_in_list_fetched_once() {
        let mut manager = manager();
        add_list(
            &mut manager,
            "menu",
            vec![
                AssetDescriptor::image("logo.png"),
                AssetDescriptor::image("logo.png"),
            ],
        );

        let outcome = manager.load_assets("menu", false).unwrap();
        assert!(matches!(outcome, LoadOutcome::Started { files: 1, .. }));
    }

    #[test]
    fn test_cached_assets_are_skipped() {
        let mut manager = manager();
        add_list(
            &mut manager,
            "menu",
            vec![
                AssetDescriptor::image("logo.png"),
                AssetDescriptor::atlas("ui"),
                AssetDescriptor::sound("click", &["ogg"]),
            ],
        );
        let engine = manager.fetch_engine_mut();
        engine.insert_cached(Namespace::Image, "logo");
        engine.insert_cached(Namespace::Image, "ui");
        engine.insert_cached(Namespace::Sound, "click");
        manager.audio_mut().insert_decoded("click");

        let outcome = manager.load_assets("menu", false).unwrap();

        assert_eq!(outcome, LoadOutcome::Completed);
        assert!(manager.fetch_engine().history().is_empty());
        assert!(manager.has_loaded_assets("menu"));
    }

    #[test]
    fn test_fetched_but_undecoded_sound_is_queued_again() {
        let mut manager = manager();
        manager
            .fetch_engine_mut()
            .insert_cached(Namespace::Sound, "music");
        add_list(
            &mut manager,
            "level",
            vec![AssetDescriptor::sound("music", &["ogg"])],
        );

        let outcome = manager.load_assets("level", false).unwrap();
        assert!(matches!(outcome, LoadOutcome::Started { sounds: 1, .. }));
    }

    #[test]
    fn test_text_is_always_fetched() {
        let mut manager = manager();
        manager.fetch_engine_mut().insert_cached(Namespace::Text, "copy");
        add_list(&mut manager, "menu", vec![AssetDescriptor::text("copy.json")]);

        manager.load_assets("menu", false).unwrap();

        assert_eq!(
            manager.fetch_engine().history(),
            &[FetchRequest::Text {
                key: "copy".to_string(),
                url: "assets/data/copy.json".to_string()
            }]
        );
    }

    #[test]
    fn test_nested_lists_are_flattened() {
        let mut manager = manager();
        add_list(&mut manager, "common", vec![AssetDescriptor::image("logo.png")]);
        add_list(
            &mut manager,
            "level",
            vec![
                AssetDescriptor::list_ref("common"),
                AssetDescriptor::atlas("tiles"),
            ],
        );

        manager.load_assets("level", false).unwrap();

        let keys: Vec<&str> = manager
            .fetch_engine()
            .history()
            .iter()
            .map(|r| r.key())
            .collect();
        assert_eq!(keys, vec!["logo", "tiles"]);
    }

    #[test]
    fn test_cycle_is_rejected_before_queueing() {
        let mut manager = manager();
        add_list(
            &mut manager,
            "a",
            vec![AssetDescriptor::image("x.png"), AssetDescriptor::list_ref("b")],
        );
        add_list(&mut manager, "b", vec![AssetDescriptor::list_ref("a")]);

        let result = manager.load_assets("a", false);

        assert!(matches!(result, Err(AssetError::AssetListCycle(_))));
        assert!(manager.fetch_engine().history().is_empty());
        assert!(!manager.is_loading());
    }

    #[test]
    fn test_sound_without_extensions_fails_fast() {
        let mut manager = manager();
        add_list(
            &mut manager,
            "level",
            vec![
                AssetDescriptor::image("bg.png"),
                AssetDescriptor::new(AssetType::Sound, "music"),
            ],
        );

        let result = manager.load_assets("level", false);

        assert!(matches!(
            result,
            Err(AssetError::InvalidAssetDescriptor { .. })
        ));
        assert_eq!(manager.fetch_engine().queued_len(), 0);
        assert!(manager.fetch_engine().history().is_empty());
    }

    #[test]
    fn test_clear_assets_keeps_required() {
        let mut manager = manager();
        add_list(
            &mut manager,
            "menu",
            vec![
                AssetDescriptor::image("logo.png").required(),
                AssetDescriptor::image("bg.png"),
            ],
        );
        manager.load_assets("menu", false).unwrap();
        manager.fetch_engine_mut().complete_all();
        manager.update().unwrap();
        assert!(manager.has_loaded_assets("menu"));

        let report = manager.clear_assets("menu", ClearOptions::all());

        assert_eq!(report.evicted, vec!["bg".to_string()]);
        assert!(manager.fetch_engine().has_image("logo"));
        assert!(!manager.fetch_engine().has_image("bg"));
        assert!(!manager.has_loaded_assets("menu"));
    }

    #[test]
    fn test_superseded_session_events_are_dropped() {
        let mut manager = manager();
        add_list(
            &mut manager,
            "a",
            vec![
                AssetDescriptor::image("a1.png"),
                AssetDescriptor::sound("a_music", &["ogg"]),
            ],
        );
        add_list(&mut manager, "b", vec![AssetDescriptor::image("b1.png")]);
        let seen = record(manager.signals_mut());

        manager.load_assets("a", false).unwrap();
        manager.fetch_engine_mut().complete_next();
        manager.update().unwrap();

        manager.load_assets("b", false).unwrap();
        // Finishes a's leftover file first, then b's
        assert_eq!(manager.fetch_engine_mut().complete_next().as_deref(), Some("a_music"));
        manager.update().unwrap();
        assert_eq!(manager.audio_mut().decode_all(), 0, "Nobody watches a_music");
        manager.update().unwrap();

        assert!(!seen
            .borrow()
            .contains(&Seen::FileStart("a_music".to_string())));
        assert_eq!(count(&seen, &Seen::Complete), 0);
        assert!(!manager.has_loaded_assets("a"));

        manager.fetch_engine_mut().complete_all();
        manager.update().unwrap();
        assert!(manager.has_loaded_assets("b"));
        assert!(!manager.has_loaded_assets("a"));
        assert_eq!(count(&seen, &Seen::Start), 2);
        assert_eq!(count(&seen, &Seen::Complete), 1);
        assert_eq!(count(&seen, &Seen::Decoded), 1);
    }

    #[test]
    fn test_background_load_uses_background_signals() {
        let mut manager = manager();
        add_list(&mut manager, "later", vec![AssetDescriptor::image("x.png")]);
        let game = record(manager.signals_mut());
        let background = record(manager.background_signals_mut());

        manager.load_assets("later", true).unwrap();
        manager.fetch_engine_mut().complete_all();
        manager.update().unwrap();

        assert!(game.borrow().is_empty());
        assert_eq!(
            *background.borrow(),
            vec![Seen::Start, Seen::File(100.0), Seen::Complete, Seen::Decoded]
        );
        assert!(manager.has_loaded_assets("later"));
    }

    #[test]
    fn test_load_queue_runs_once() {
        let mut manager = manager();
        manager
            .set_data(
                r#"{
                    "boot": { "autoload": true, "assets": [ { "type": "image", "url": "a.png" } ] },
                    "extra": { "audtoload": true, "assets": [ { "type": "sound", "key": "s", "extensions": "ogg" } ] },
                    "level": { "assets": [ { "type": "image", "url": "b.png" } ] }
                }"#,
            )
            .unwrap();
        let background = record(manager.background_signals_mut());

        let outcome = manager.load_queue().unwrap();
        assert!(matches!(outcome, LoadOutcome::Started { files: 2, sounds: 1, .. }));
        assert!(manager.is_loading_queue());
        assert_eq!(manager.load_queue().unwrap(), LoadOutcome::AlreadyLoading);

        manager.fetch_engine_mut().complete_all();
        manager.update().unwrap();
        manager.audio_mut().decode_all();
        manager.update().unwrap();

        assert!(!manager.is_loading_queue());
        assert!(manager.has_loaded_assets("boot"));
        assert!(manager.has_loaded_assets("extra"));
        assert!(!manager.has_loaded_assets("level"));
        assert_eq!(count(&background, &Seen::Decoded), 1);
    }

    #[test]
    fn test_load_queue_waits_for_other_session() {
        let mut manager = manager();
        add_list(&mut manager, "level", vec![AssetDescriptor::image("b.png")]);
        manager.load_assets("level", false).unwrap();

        assert_eq!(manager.load_queue().unwrap(), LoadOutcome::Busy);
        assert!(!manager.is_loading_queue());
    }

    #[test]
    fn test_superseding_queue_clears_flag() {
        let mut manager = manager();
        manager
            .set_data(
                r#"{
                    "boot": { "autoload": true, "assets": [ { "type": "image", "url": "a.png" } ] },
                    "level": { "assets": [ { "type": "image", "url": "b.png" } ] }
                }"#,
            )
            .unwrap();

        manager.load_queue().unwrap();
        manager.load_assets("level", false).unwrap();

        assert!(!manager.is_loading_queue());
    }

    #[test]
    fn test_decode_timeout() {
        let mut manager = AssetManager::new(
            LoaderConfig {
                decode_timeout_ms: Some(1_000),
                ..LoaderConfig::default()
            },
            MemoryFetchEngine::new(),
            MemoryAudio::new(),
        );
        add_list(
            &mut manager,
            "level",
            vec![AssetDescriptor::sound("music", &["ogg"])],
        );
        let seen = record(manager.signals_mut());

        manager.load_assets("level", false).unwrap();
        manager.fetch_engine_mut().complete_all();
        let now = Instant::now();
        manager.update_at(now).unwrap();

        let result = manager.update_at(now + Duration::from_secs(2));
        match result {
            Err(AssetError::DecodeTimeout { session, pending }) => {
                assert_eq!(session, "level");
                assert_eq!(pending, vec!["music".to_string()]);
            }
            other => panic!("Expected timeout, got {:?}", other),
        }
        assert!(!manager.is_loading());
        assert!(!manager.has_loaded_assets("level"));
        assert!(!manager.all_sounds_decoded());
        assert_eq!(manager.abandoned_sounds(), &["music".to_string()]);
        assert_relative_eq!(manager.max_percent(), 100.0);

        // A late decode changes nothing
        manager.audio_mut().decode("music");
        manager.update().unwrap();
        assert_eq!(count(&seen, &Seen::Decoded), 0);
        assert!(!manager.all_sounds_decoded());

        // The next session starts clean
        add_list(&mut manager, "menu", vec![AssetDescriptor::image("bg.png")]);
        manager.load_assets("menu", false).unwrap();
        assert!(manager.all_sounds_decoded());
        assert!(manager.abandoned_sounds().is_empty());
    }

    #[test]
    fn test_direct_loads_with_start() {
        let mut manager = manager();
        manager.load_atlas("ui");
        manager
            .load_audio_sprite("sfx", &["ogg".to_string()])
            .unwrap();
        manager.load_bitmap_font("arcade");

        let outcome = manager.start(false);
        assert!(matches!(outcome, LoadOutcome::Started { files: 3, sounds: 1, .. }));

        manager.fetch_engine_mut().complete_all();
        manager.update().unwrap();
        manager.audio_mut().decode_all();
        manager.update().unwrap();

        assert!(!manager.is_loading());
        assert_eq!(manager.audio().registered(), &[("sfx".to_string(), true)]);
    }

    #[test]
    fn test_custom_decode_modifier() {
        let mut manager = manager();
        manager.set_sound_decoding_modifier(4.0);
        add_list(
            &mut manager,
            "sfx",
            vec![
                AssetDescriptor::sound("a", &["ogg"]),
                AssetDescriptor::sound("b", &["ogg"]),
            ],
        );

        manager.load_assets("sfx", false).unwrap();
        assert_relative_eq!(manager.max_percent(), 92.0);
    }

    #[test]
    fn test_ios_requests_m4a_first() {
        let mut manager = AssetManager::new(
            LoaderConfig {
                platform: crate::engine::assets::Platform::Ios,
                ..LoaderConfig::default()
            },
            MemoryFetchEngine::new(),
            MemoryAudio::new(),
        );
        manager.load_sound("click", &["ogg".to_string()]).unwrap();

        assert_eq!(
            manager.fetch_engine().history(),
            &[FetchRequest::Audio {
                key: "click".to_string(),
                urls: vec![
                    "assets/audio/sound/click.m4a".to_string(),
                    "assets/audio/sound/click.ogg".to_string()
                ]
            }]
        );
    }
}
