// Load progress that keeps room for audio decoding
//
// The fetch engine reports 0..100 for raw transfers only. Each sound still has to
// decode afterwards, so the reported value is scaled down to `max_percent`,
// which climbs back to 100 as sounds finish decoding.

use super::config::DEFAULT_DECODE_MODIFIER;

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressTracker {
    /// Requested share of the bar per sound
    modifier: f32,

    /// Share actually used this session, see `begin`
    session_modifier: f32,

    pending_at_start: usize,
    decoded: usize,
    max_percent: f32,
}

impl ProgressTracker {
    pub fn new(modifier: f32) -> Self {
        let modifier = sanitize(modifier);
        Self {
            modifier,
            session_modifier: modifier,
            pending_at_start: 0,
            decoded: 0,
            max_percent: 100.0,
        }
    }

    /// Change the per-sound share used by the next session
    pub fn set_modifier(&mut self, modifier: f32) {
        self.modifier = sanitize(modifier);
    }

    pub fn modifier(&self) -> f32 {
        self.modifier
    }

    /// Start a session with `sounds` decodes outstanding
    ///
    /// If the sounds would reserve more than the whole bar, the share per sound
    /// shrinks so the ceiling starts at 0 instead of going negative.
    pub fn begin(&mut self, sounds: usize) {
        self.pending_at_start = sounds;
        self.decoded = 0;
        self.session_modifier = if sounds as f32 * self.modifier > 100.0 {
            100.0 / sounds as f32
        } else {
            self.modifier
        };
        self.max_percent = self.ceiling();
    }

    /// Record one finished decode
    pub fn sound_decoded(&mut self) {
        if self.decoded < self.pending_at_start {
            self.decoded += 1;
        }
        self.max_percent = self.ceiling();
    }

    fn ceiling(&self) -> f32 {
        if self.decoded == self.pending_at_start {
            return 100.0;
        }
        let start = 100.0 - self.pending_at_start as f32 * self.session_modifier;
        (start + self.decoded as f32 * self.session_modifier).clamp(0.0, 100.0)
    }

    pub fn max_percent(&self) -> f32 {
        self.max_percent
    }

    /// Scale raw fetch progress into the current ceiling
    pub fn adjust(&self, raw: f32) -> f32 {
        raw * self.max_percent / 100.0
    }

    pub fn pending(&self) -> usize {
        self.pending_at_start - self.decoded
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(DEFAULT_DECODE_MODIFIER)
    }
}

// Anything unusable falls back to the default share
fn sanitize(modifier: f32) -> f32 {
    if modifier.is_finite() && modifier > 0.0 {
        modifier
    } else {
        DEFAULT_DECODE_MODIFIER
    }
}
