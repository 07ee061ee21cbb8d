// Decode waiter: tracks sounds between "fetched" and "decoded"

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

/// A sound that must decode before its session is ready
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeJob {
    pub key: String,
    pub is_audio_sprite: bool,
}

/// Result of feeding one decode notification to the waiter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// The fetch is still running; replayed by `fetch_completed`
    Deferred,
    /// Not a sound this session waits for
    Ignored,
    /// Job finished; `drained` is true when it was the last one
    Decoded { job: DecodeJob, drained: bool },
}

/// Jobs are keyed by sound key, never by position, since decodes finish in any order.
#[derive(Debug, Default)]
pub struct DecodeWaiter {
    pending: BTreeMap<String, DecodeJob>,
    watching: BTreeSet<String>,
    deferred: Vec<String>,
    fetch_complete_at: Option<Instant>,
}

impl DecodeWaiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sound queued for fetch. Returns false if it was already expected.
    pub fn expect(&mut self, key: &str, is_audio_sprite: bool) -> bool {
        if self.pending.contains_key(key) {
            return false;
        }
        self.pending.insert(
            key.to_string(),
            DecodeJob {
                key: key.to_string(),
                is_audio_sprite,
            },
        );
        true
    }

    /// A file finished fetching. Returns the job to watch if the file is a pending
    /// sound nobody watches yet.
    pub fn on_fetched(&mut self, key: &str) -> Option<DecodeJob> {
        let job = self.pending.get(key)?;
        if self.watching.insert(key.to_string()) {
            Some(job.clone())
        } else {
            None
        }
    }

    /// Jobs that never got a per-file completion
    pub fn unwatched(&mut self) -> Vec<DecodeJob> {
        let jobs: Vec<DecodeJob> = self
            .pending
            .values()
            .filter(|job| !self.watching.contains(&job.key))
            .cloned()
            .collect();
        for job in &jobs {
            self.watching.insert(job.key.clone());
        }
        jobs
    }

    pub fn on_decoded(&mut self, key: &str) -> DecodeOutcome {
        if !self.pending.contains_key(key) {
            return DecodeOutcome::Ignored;
        }
        if self.fetch_complete_at.is_none() {
            if !self.deferred.iter().any(|k| k == key) {
                self.deferred.push(key.to_string());
            }
            return DecodeOutcome::Deferred;
        }

        self.watching.remove(key);
        match self.pending.remove(key) {
            Some(job) => DecodeOutcome::Decoded {
                job,
                drained: self.pending.is_empty(),
            },
            None => DecodeOutcome::Ignored,
        }
    }

    /// Raw fetching is over. Returns keys whose decode arrived early, in arrival order.
    pub fn fetch_completed(&mut self, now: Instant) -> Vec<String> {
        self.fetch_complete_at = Some(now);
        std::mem::take(&mut self.deferred)
    }

    pub fn is_fetch_complete(&self) -> bool {
        self.fetch_complete_at.is_some()
    }

    pub fn is_drained(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_keys(&self) -> Vec<String> {
        self.pending.keys().cloned().collect()
    }

    /// Whether the wait after fetch completion has exceeded `timeout`
    pub fn timed_out(&self, now: Instant, timeout: Duration) -> bool {
        match self.fetch_complete_at {
            Some(started) => !self.is_drained() && now.duration_since(started) > timeout,
            None => false,
        }
    }
}
