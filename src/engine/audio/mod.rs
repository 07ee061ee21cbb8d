// Audio subsystem contract
//
// The loader never decodes anything itself. It asks the audio system to tell it
// when a fetched sound is ready, then hands the key back for registration so
// playback can start.

use crate::engine::events::BatchId;
use crossbeam_channel::Sender;
use std::collections::{HashMap, HashSet};

/// Sent once when a watched sound finishes decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeEvent {
    pub batch: BatchId,
    pub key: String,
}

pub trait AudioSystem {
    /// Whether the sound is cached and already decoded
    fn is_decoded(&self, key: &str) -> bool;

    /// Ask for a one-shot [`DecodeEvent`] once `key` is decoded
    fn watch_decode(
        &mut self,
        key: &str,
        is_audio_sprite: bool,
        batch: BatchId,
        events: Sender<DecodeEvent>,
    );

    /// Make a decoded sound available for playback
    fn register_decoded_audio(&mut self, key: &str, is_audio_sprite: bool);

    /// Forget a sound, returning whether it was known
    fn remove_audio(&mut self, key: &str) -> bool;
}

struct Watch {
    batch: BatchId,
    events: Sender<DecodeEvent>,
}

/// Audio system that decodes on demand
///
/// Watched sounds stay pending until [`MemoryAudio::decode`] is called for them,
/// in whatever order the driver picks.
#[derive(Default)]
pub struct MemoryAudio {
    watches: HashMap<String, Watch>,
    watch_order: Vec<String>,
    decoded: HashSet<String>,
    registered: Vec<(String, bool)>,
}

impl MemoryAudio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finish decoding one watched sound. Returns false if nothing watches it.
    pub fn decode(&mut self, key: &str) -> bool {
        let Some(watch) = self.watches.remove(key) else {
            return false;
        };
        self.watch_order.retain(|k| k != key);
        self.decoded.insert(key.to_string());
        let _ = watch.events.send(DecodeEvent {
            batch: watch.batch,
            key: key.to_string(),
        });
        true
    }

    /// Decode everything pending in watch order
    pub fn decode_all(&mut self) -> usize {
        let keys = self.watch_order.clone();
        keys.iter().filter(|k| self.decode(k)).count()
    }

    /// Keys still waiting to decode, in watch order
    pub fn pending(&self) -> &[String] {
        &self.watch_order
    }

    /// Mark a sound decoded without any watch, as if loaded earlier
    pub fn insert_decoded(&mut self, key: &str) {
        self.decoded.insert(key.to_string());
    }

    /// Every registration received, oldest first
    pub fn registered(&self) -> &[(String, bool)] {
        &self.registered
    }
}

impl AudioSystem for MemoryAudio {
    fn is_decoded(&self, key: &str) -> bool {
        self.decoded.contains(key)
    }

    fn watch_decode(
        &mut self,
        key: &str,
        _is_audio_sprite: bool,
        batch: BatchId,
        events: Sender<DecodeEvent>,
    ) {
        if self.watches.insert(key.to_string(), Watch { batch, events }).is_none() {
            self.watch_order.push(key.to_string());
        }
    }

    fn register_decoded_audio(&mut self, key: &str, is_audio_sprite: bool) {
        self.registered.push((key.to_string(), is_audio_sprite));
    }

    fn remove_audio(&mut self, key: &str) -> bool {
        self.registered.retain(|(k, _)| k != key);
        self.decoded.remove(key)
    }
}
