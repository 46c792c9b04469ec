//! Checkpoint records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CheckpointId, DraftId, Snapshot};

/// What caused a checkpoint to be taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    /// Requested by the user. Never pruned by retention.
    Manual,
    /// Produced by autosave or another background trigger.
    Automatic,
}

impl Trigger {
    pub fn is_manual(self) -> bool {
        matches!(self, Self::Manual)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Automatic => "automatic",
        }
    }
}

/// Immutable snapshot of a draft at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: CheckpointId,
    pub draft_id: DraftId,
    /// Logical namespace of the editor (e.g. "composer").
    pub context: String,
    pub trigger: Trigger,
    pub created_at: DateTime<Utc>,
    /// SHA-256 of the snapshot bytes.
    pub digest: String,
    pub snapshot: Snapshot,
}

impl Checkpoint {
    pub fn new(
        draft_id: DraftId,
        context: impl Into<String>,
        trigger: Trigger,
        created_at: DateTime<Utc>,
        snapshot: Snapshot,
    ) -> Self {
        Self {
            id: CheckpointId::new(),
            draft_id,
            context: context.into(),
            trigger,
            created_at,
            digest: snapshot.digest(),
            snapshot,
        }
    }

    pub fn is_manual(&self) -> bool {
        self.trigger.is_manual()
    }

    /// The manifest entry describing this checkpoint.
    pub fn entry(&self) -> CheckpointEntry {
        CheckpointEntry {
            id: self.id,
            trigger: self.trigger,
            created_at: self.created_at,
            size: self.snapshot.len(),
        }
    }
}

/// Manifest line for one checkpoint (no payload).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointEntry {
    pub id: CheckpointId,
    pub trigger: Trigger,
    pub created_at: DateTime<Utc>,
    /// Snapshot size in bytes.
    #[serde(default)]
    pub size: usize,
}
