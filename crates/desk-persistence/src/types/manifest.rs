//! Per-draft manifest.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{CheckpointEntry, CheckpointId, DraftId};

/// Ordered index of the checkpoints of one draft.
///
/// Entries are sorted by `created_at`, strictly increasing. The last entry is
/// the draft's current checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftManifest {
    /// Schema version (for future migrations).
    pub schema_version: u32,
    pub draft_id: DraftId,
    pub context: String,
    pub created_at: DateTime<Utc>,
    pub entries: Vec<CheckpointEntry>,
}

impl DraftManifest {
    /// Create an empty manifest for a new draft.
    pub fn new(draft_id: DraftId, context: impl Into<String>) -> Self {
        Self {
            schema_version: super::CURRENT_SCHEMA_VERSION,
            draft_id,
            context: context.into(),
            created_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    /// The most recent checkpoint, regardless of trigger.
    pub fn latest(&self) -> Option<&CheckpointEntry> {
        self.entries.last()
    }

    pub fn find(&self, id: CheckpointId) -> Option<&CheckpointEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Timestamp for the next checkpoint.
    ///
    /// Returns `now` unless the clock hasn't moved past the latest entry, in
    /// which case the latest timestamp plus one microsecond is used.
    pub fn next_timestamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.latest() {
            Some(latest) if now <= latest.created_at => {
                latest.created_at + Duration::microseconds(1)
            }
            _ => now,
        }
    }

    pub fn push(&mut self, entry: CheckpointEntry) {
        debug_assert!(
            self.latest()
                .is_none_or(|latest| latest.created_at < entry.created_at)
        );
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Trigger;

    fn entry_at(created_at: DateTime<Utc>) -> CheckpointEntry {
        CheckpointEntry {
            id: CheckpointId::new(),
            trigger: Trigger::Automatic,
            created_at,
            size: 0,
        }
    }

    #[test]
    fn test_next_timestamp_bumps_stalled_clock() {
        let mut manifest = DraftManifest::new(DraftId::new(), "composer");
        let now = Utc::now();
        assert_eq!(manifest.next_timestamp(now), now);

        manifest.push(entry_at(now));
        let next = manifest.next_timestamp(now);
        assert_eq!(next, now + Duration::microseconds(1));

        let earlier = now - Duration::seconds(5);
        assert!(manifest.next_timestamp(earlier) > now);
    }

    #[test]
    fn test_latest_is_last_entry() {
        let mut manifest = DraftManifest::new(DraftId::new(), "composer");
        assert!(manifest.latest().is_none());

        let now = Utc::now();
        manifest.push(entry_at(now));
        let second = entry_at(now + Duration::seconds(1));
        let second_id = second.id;
        manifest.push(second);

        assert_eq!(manifest.latest().map(|e| e.id), Some(second_id));
        assert!(manifest.find(second_id).is_some());
    }
}
