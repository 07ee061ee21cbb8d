// Fetch engine contract and an in-memory implementation

use crate::engine::events::BatchId;
use crossbeam_channel::Sender;
use std::collections::{HashMap, HashSet, VecDeque};

/// Cache namespace a key lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Image,
    Sound,
    Text,
    Font,
}

/// One request handed to the fetch engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    Image {
        key: String,
        url: String,
    },
    Atlas {
        key: String,
        image_url: String,
        json_url: String,
    },
    Audio {
        key: String,
        urls: Vec<String>,
    },
    AudioSprite {
        key: String,
        urls: Vec<String>,
        json_url: String,
    },
    Text {
        key: String,
        url: String,
    },
    BitmapFont {
        key: String,
        texture_url: String,
        descriptor_url: String,
    },
}

impl FetchRequest {
    pub fn key(&self) -> &str {
        match self {
            FetchRequest::Image { key, .. }
            | FetchRequest::Atlas { key, .. }
            | FetchRequest::Audio { key, .. }
            | FetchRequest::AudioSprite { key, .. }
            | FetchRequest::Text { key, .. }
            | FetchRequest::BitmapFont { key, .. } => key,
        }
    }

    pub fn namespace(&self) -> Namespace {
        match self {
            FetchRequest::Image { .. } | FetchRequest::Atlas { .. } => Namespace::Image,
            FetchRequest::Audio { .. } | FetchRequest::AudioSprite { .. } => Namespace::Sound,
            FetchRequest::Text { .. } => Namespace::Text,
            FetchRequest::BitmapFont { .. } => Namespace::Font,
        }
    }
}

/// What happened in the fetch engine
#[derive(Debug, Clone, PartialEq)]
pub enum FetchEventKind {
    LoadStart,
    FileStart {
        key: String,
    },
    FileComplete {
        /// Raw progress of the whole batch, 0 to 100
        progress: f32,
        key: String,
        file_index: usize,
        total_files: usize,
    },
    LoadComplete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchEvent {
    pub batch: BatchId,
    pub kind: FetchEventKind,
}

/// The engine that performs transfers and owns the raw caches
///
/// Implementations report progress by sending [`FetchEvent`]s stamped with the
/// batch passed to [`FetchEngine::start`].
pub trait FetchEngine {
    /// Queue a request. Returns false when the key is already queued in its namespace.
    fn enqueue(&mut self, request: FetchRequest) -> bool;

    /// Number of requests waiting for `start`
    fn queued_len(&self) -> usize;

    /// Drop queued requests. Transfers already started keep going.
    fn reset(&mut self);

    /// Begin transferring everything queued
    fn start(&mut self, batch: BatchId, events: Sender<FetchEvent>);

    fn has_image(&self, key: &str) -> bool;
    fn has_sound(&self, key: &str) -> bool;
    fn has_text(&self, key: &str) -> bool;
    fn has_bitmap_font(&self, key: &str) -> bool;

    fn remove_image(&mut self, key: &str) -> bool;
    fn remove_atlas(&mut self, key: &str) -> bool;
    fn remove_sound(&mut self, key: &str) -> bool;
    fn remove_text(&mut self, key: &str) -> bool;
    fn remove_bitmap_font(&mut self, key: &str) -> bool;

    fn enqueue_image(&mut self, key: &str, url: &str) -> bool {
        self.enqueue(FetchRequest::Image {
            key: key.to_string(),
            url: url.to_string(),
        })
    }

    fn enqueue_atlas(&mut self, key: &str, image_url: &str, json_url: &str) -> bool {
        self.enqueue(FetchRequest::Atlas {
            key: key.to_string(),
            image_url: image_url.to_string(),
            json_url: json_url.to_string(),
        })
    }

    fn enqueue_audio(&mut self, key: &str, urls: Vec<String>) -> bool {
        self.enqueue(FetchRequest::Audio {
            key: key.to_string(),
            urls,
        })
    }

    fn enqueue_audio_sprite(&mut self, key: &str, urls: Vec<String>, json_url: &str) -> bool {
        self.enqueue(FetchRequest::AudioSprite {
            key: key.to_string(),
            urls,
            json_url: json_url.to_string(),
        })
    }

    fn enqueue_text(&mut self, key: &str, url: &str) -> bool {
        self.enqueue(FetchRequest::Text {
            key: key.to_string(),
            url: url.to_string(),
        })
    }

    fn enqueue_bitmap_font(&mut self, key: &str, texture_url: &str, descriptor_url: &str) -> bool {
        self.enqueue(FetchRequest::BitmapFont {
            key: key.to_string(),
            texture_url: texture_url.to_string(),
            descriptor_url: descriptor_url.to_string(),
        })
    }
}

struct RunningBatch {
    batch: BatchId,
    events: Sender<FetchEvent>,
    files: VecDeque<FetchRequest>,
    total_files: usize,
    completed: usize,
}

/// Fetch engine that keeps everything in memory
///
/// Nothing is transferred on its own: call [`MemoryFetchEngine::complete_next`]
/// to finish one file of the oldest running batch. Batches keep running after
/// `reset`, the same way real transfers cannot be recalled.
#[derive(Default)]
pub struct MemoryFetchEngine {
    queue: Vec<FetchRequest>,
    running: VecDeque<RunningBatch>,
    cache: HashMap<Namespace, HashSet<String>>,
    history: Vec<FetchRequest>,
}

impl MemoryFetchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request accepted by `enqueue`, oldest first
    pub fn history(&self) -> &[FetchRequest] {
        &self.history
    }

    /// Whether any started batch still has files left
    pub fn is_busy(&self) -> bool {
        !self.running.is_empty()
    }

    /// Put a key straight into a cache, as if fetched earlier
    pub fn insert_cached(&mut self, namespace: Namespace, key: &str) {
        self.cache.entry(namespace).or_default().insert(key.to_string());
    }

    /// Finish the next file of the oldest running batch, returning its key
    pub fn complete_next(&mut self) -> Option<String> {
        let run = self.running.front_mut()?;
        let request = run.files.pop_front()?;
        run.completed += 1;

        let key = request.key().to_string();
        let progress = run.completed as f32 * 100.0 / run.total_files as f32;
        let _ = run.events.send(FetchEvent {
            batch: run.batch,
            kind: FetchEventKind::FileStart { key: key.clone() },
        });
        let _ = run.events.send(FetchEvent {
            batch: run.batch,
            kind: FetchEventKind::FileComplete {
                progress,
                key: key.clone(),
                file_index: run.completed,
                total_files: run.total_files,
            },
        });

        if run.files.is_empty() {
            let _ = run.events.send(FetchEvent {
                batch: run.batch,
                kind: FetchEventKind::LoadComplete,
            });
            self.running.pop_front();
        }

        self.cache
            .entry(request.namespace())
            .or_default()
            .insert(key.clone());
        Some(key)
    }

    /// Finish every running batch, returning how many files completed
    pub fn complete_all(&mut self) -> usize {
        let mut count = 0;
        while self.complete_next().is_some() {
            count += 1;
        }
        count
    }

    fn cached(&self, namespace: Namespace, key: &str) -> bool {
        self.cache
            .get(&namespace)
            .map_or(false, |keys| keys.contains(key))
    }

    fn evict(&mut self, namespace: Namespace, key: &str) -> bool {
        self.cache
            .get_mut(&namespace)
            .map_or(false, |keys| keys.remove(key))
    }
}

impl FetchEngine for MemoryFetchEngine {
    fn enqueue(&mut self, request: FetchRequest) -> bool {
        let duplicate = self
            .queue
            .iter()
            .any(|r| r.namespace() == request.namespace() && r.key() == request.key());
        if duplicate {
            log::debug!("'{}' already queued", request.key());
            return false;
        }

        self.history.push(request.clone());
        self.queue.push(request);
        true
    }

    fn queued_len(&self) -> usize {
        self.queue.len()
    }

    fn reset(&mut self) {
        self.queue.clear();
    }

    fn start(&mut self, batch: BatchId, events: Sender<FetchEvent>) {
        let files: VecDeque<FetchRequest> = self.queue.drain(..).collect();
        let _ = events.send(FetchEvent {
            batch,
            kind: FetchEventKind::LoadStart,
        });

        if files.is_empty() {
            let _ = events.send(FetchEvent {
                batch,
                kind: FetchEventKind::LoadComplete,
            });
            return;
        }

        self.running.push_back(RunningBatch {
            batch,
            events,
            total_files: files.len(),
            files,
            completed: 0,
        });
    }

    fn has_image(&self, key: &str) -> bool {
        self.cached(Namespace::Image, key)
    }

    fn has_sound(&self, key: &str) -> bool {
        self.cached(Namespace::Sound, key)
    }

    fn has_text(&self, key: &str) -> bool {
        self.cached(Namespace::Text, key)
    }

    fn has_bitmap_font(&self, key: &str) -> bool {
        self.cached(Namespace::Font, key)
    }

    fn remove_image(&mut self, key: &str) -> bool {
        self.evict(Namespace::Image, key)
    }

    fn remove_atlas(&mut self, key: &str) -> bool {
        self.evict(Namespace::Image, key)
    }

    fn remove_sound(&mut self, key: &str) -> bool {
        self.evict(Namespace::Sound, key)
    }

    fn remove_text(&mut self, key: &str) -> bool {
        self.evict(Namespace::Text, key)
    }

    fn remove_bitmap_font(&mut self, key: &str) -> bool {
        self.evict(Namespace::Font, key)
    }
}
