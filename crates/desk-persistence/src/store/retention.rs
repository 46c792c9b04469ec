//! Pruning of automatic checkpoints.

use crate::types::{CheckpointEntry, DraftManifest};

/// How many automatic checkpoints a draft keeps.
///
/// Manual checkpoints are never pruned, and neither is the current (latest)
/// checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Maximum automatic checkpoints per draft. `None` keeps all of them.
    pub max_automatic: Option<usize>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_automatic: Some(50),
        }
    }
}

impl RetentionPolicy {
    /// Keep every checkpoint.
    pub fn unbounded() -> Self {
        Self {
            max_automatic: None,
        }
    }

    pub fn keep_automatic(max: usize) -> Self {
        Self {
            max_automatic: Some(max),
        }
    }

    /// Remove the oldest automatic entries beyond the limit.
    ///
    /// Returns the removed entries so their payloads can be deleted.
    pub fn prune(&self, manifest: &mut DraftManifest) -> Vec<CheckpointEntry> {
        let Some(max) = self.max_automatic else {
            return Vec::new();
        };
        let Some(last) = manifest.entries.len().checked_sub(1) else {
            return Vec::new();
        };

        let current_is_automatic = !manifest.entries[last].trigger.is_manual();
        let allowed = max.saturating_sub(usize::from(current_is_automatic));
        let candidates: Vec<usize> = manifest.entries[..last]
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.trigger.is_manual())
            .map(|(index, _)| index)
            .collect();
        if candidates.len() <= allowed {
            return Vec::new();
        }

        let excess = candidates.len() - allowed;
        let doomed = &candidates[..excess];
        let mut pruned = Vec::with_capacity(excess);
        let mut kept = Vec::with_capacity(manifest.entries.len() - excess);
        for (index, entry) in manifest.entries.drain(..).enumerate() {
            if doomed.binary_search(&index).is_ok() {
                pruned.push(entry);
            } else {
                kept.push(entry);
            }
        }
        manifest.entries = kept;
        pruned
    }
}
