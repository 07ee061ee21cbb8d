// Load lifecycle events
//
// Every session reports through one `LoadSignals` set. The manager owns two of
// them, one for game-facing loads and one for background prefetches, so the two
// kinds never trigger each other's listeners.
//
// Order for a session:
// load_start, {file_start, file_complete}*, load_complete,
// {decode-driven file_complete}*, load_complete_and_audio_decoded

mod signal;

pub use signal::{Signal, Subscription};

/// Stamp carried by every collaborator event of one session
///
/// Events whose batch is not the active session's belong to a superseded
/// session and are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId(pub u64);

impl BatchId {
    pub fn next(&self) -> Self {
        BatchId(self.0 + 1)
    }
}

/// Which channel a session reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    Game,
    Background,
}

impl SessionKind {
    pub fn from_background(background: bool) -> Self {
        if background {
            SessionKind::Background
        } else {
            SessionKind::Game
        }
    }

    pub fn is_background(&self) -> bool {
        matches!(self, SessionKind::Background)
    }
}

/// Payload of a file-complete event
#[derive(Debug, Clone, PartialEq)]
pub struct FileProgress {
    /// Adjusted progress, 0 to 100
    pub progress: f32,

    /// Key of the file that completed, if known
    pub key: Option<String>,

    /// 1-based index of the file within the session
    pub file_index: usize,

    /// Number of raw files in the session
    pub total_files: usize,
}

/// The five lifecycle signals of one session kind
#[derive(Debug, Default)]
pub struct LoadSignals {
    pub load_start: Signal<()>,
    pub file_start: Signal<String>,
    pub file_complete: Signal<FileProgress>,
    pub load_complete: Signal<()>,
    pub load_complete_and_audio_decoded: Signal<()>,
}

impl LoadSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Detach every listener on all five signals
    pub fn clear(&mut self) {
        self.load_start.clear();
        self.file_start.clear();
        self.file_complete.clear();
        self.load_complete.clear();
        self.load_complete_and_audio_decoded.clear();
    }
}
