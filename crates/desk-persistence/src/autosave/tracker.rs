//! Dirty state tracking for autosave.

use tokio::time::Instant;

use super::AutoSaveConfig;

/// Tracks unsaved edits in a draft.
///
/// Drives the max-delay flush and the "not saved" indicator. Uses Tokio's
/// clock so paused-time tests see consistent elapsed values.
#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    /// Whether there are unsaved edits.
    dirty: bool,

    /// When the first unsaved edit was made. Reset when saved.
    first_unsaved_change: Option<Instant>,

    /// Whether a save is currently in progress.
    saving: bool,

    /// Whether the most recent automatic save failed.
    auto_save_failed: bool,
}

impl DirtyTracker {
    /// Create a new tracker with no unsaved edits.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the draft as having unsaved edits.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        if self.first_unsaved_change.is_none() {
            self.first_unsaved_change = Some(Instant::now());
        }
    }

    /// Mark that a save has started.
    pub fn start_save(&mut self) {
        self.saving = true;
    }

    /// Mark that a save has completed.
    ///
    /// `clean` is false when edits arrived while the save was running; those
    /// still need their own save, so the tracker stays dirty and their
    /// max-delay window starts now.
    pub fn save_complete(&mut self, clean: bool) {
        self.saving = false;
        self.auto_save_failed = false;
        if clean {
            self.dirty = false;
            self.first_unsaved_change = None;
        } else {
            self.first_unsaved_change = Some(Instant::now());
        }
    }

    /// Mark that a save has failed. The draft stays dirty.
    pub fn save_failed(&mut self, manual: bool) {
        self.saving = false;
        if !manual {
            self.auto_save_failed = true;
        }
    }

    /// True after an automatic save failed and no save succeeded since.
    pub fn last_auto_save_failed(&self) -> bool {
        self.auto_save_failed
    }

    /// Get milliseconds since the first unsaved edit.
    fn ms_since_first_unsaved(&self) -> Option<u64> {
        self.first_unsaved_change.map(elapsed_ms)
    }

    /// Check if unsaved edits have waited longer than `max_delay_ms`.
    ///
    /// Never true while a save is running.
    pub fn should_force_save(&self, config: &AutoSaveConfig) -> bool {
        self.dirty
            && !self.saving
            && self
                .ms_since_first_unsaved()
                .is_some_and(|since_first| config.should_force(since_first))
    }
}

fn elapsed_ms(at: Instant) -> u64 {
    u64::try_from(at.elapsed().as_millis()).unwrap_or(u64::MAX)
}
