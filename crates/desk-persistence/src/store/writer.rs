//! Synchronous storage logic behind the checkpoint store.
//!
//! Everything here runs on blocking threads; the async store only decides
//! *when* these functions run.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use super::RetentionPolicy;
use crate::backend::{StorageBackend, StorageKey};
use crate::digest::verify_digest;
use crate::error::{PersistenceError, Result};
use crate::types::{
    CURRENT_SCHEMA_VERSION, Checkpoint, CheckpointEntry, CheckpointId, DraftId, DraftManifest,
    Namespace, Snapshot, Trigger,
};

const MANIFEST_FILE: &str = "manifest.json";
const CHECKPOINT_DIR: &str = "checkpoints";

#[derive(Clone)]
pub(crate) struct DraftWriter {
    backend: Arc<dyn StorageBackend>,
    namespace: Namespace,
    retention: RetentionPolicy,
}

#[derive(Deserialize)]
struct VersionProbe {
    schema_version: u32,
}

impl DraftWriter {
    pub(crate) fn new(
        backend: Arc<dyn StorageBackend>,
        namespace: Namespace,
        retention: RetentionPolicy,
    ) -> Self {
        Self {
            backend,
            namespace,
            retention,
        }
    }

    fn manifest_key(&self, context: &str, draft_id: DraftId) -> Result<StorageKey> {
        let draft = draft_id.to_string();
        StorageKey::from_segments([self.namespace.as_str(), context, &draft, MANIFEST_FILE])
            .map_err(|_| invalid_context(context))
    }

    fn checkpoint_key(
        &self,
        context: &str,
        draft_id: DraftId,
        checkpoint_id: CheckpointId,
    ) -> Result<StorageKey> {
        let draft = draft_id.to_string();
        let file = format!("{checkpoint_id}.json");
        StorageKey::from_segments([
            self.namespace.as_str(),
            context,
            &draft,
            CHECKPOINT_DIR,
            &file,
        ])
        .map_err(|_| invalid_context(context))
    }

    fn read_manifest(&self, key: &StorageKey) -> Result<Option<DraftManifest>> {
        let Some(bytes) = self
            .backend
            .read(key)
            .map_err(|source| PersistenceError::ReadFailure {
                key: key.to_string(),
                source,
            })?
        else {
            return Ok(None);
        };

        let probe: VersionProbe = serde_json::from_slice(&bytes)
            .map_err(|e| PersistenceError::deserialization(key.as_str(), e))?;
        if probe.schema_version > CURRENT_SCHEMA_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: probe.schema_version,
                max_supported: CURRENT_SCHEMA_VERSION,
                key: key.to_string(),
            });
        }

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| PersistenceError::deserialization(key.as_str(), e))
    }

    /// Load the manifest of an existing draft.
    pub(crate) fn manifest(&self, context: &str, draft_id: DraftId) -> Result<DraftManifest> {
        let key = self.manifest_key(context, draft_id)?;
        self.read_manifest(&key)?
            .ok_or_else(|| PersistenceError::InvalidDraftReference {
                draft_id,
                context: context.to_string(),
            })
    }

    /// Append a checkpoint to a draft.
    ///
    /// The payload is written first and the manifest second, so a checkpoint
    /// only becomes visible once both writes landed.
    pub(crate) fn append(
        &self,
        context: &str,
        draft_id: DraftId,
        is_new: bool,
        trigger: Trigger,
        snapshot: Snapshot,
    ) -> Result<DraftId> {
        let manifest_key = self.manifest_key(context, draft_id)?;
        let mut manifest = match self.read_manifest(&manifest_key)? {
            Some(manifest) => manifest,
            None if is_new => DraftManifest::new(draft_id, context),
            None => {
                return Err(PersistenceError::InvalidDraftReference {
                    draft_id,
                    context: context.to_string(),
                });
            }
        };

        let created_at = manifest.next_timestamp(Utc::now());
        let checkpoint = Checkpoint::new(draft_id, context, trigger, created_at, snapshot);
        let checkpoint_key = self.checkpoint_key(context, draft_id, checkpoint.id)?;
        let bytes = serde_json::to_vec(&checkpoint).map_err(PersistenceError::serialization)?;
        self.backend
            .write(&checkpoint_key, &bytes)
            .map_err(|source| PersistenceError::PersistenceFailure {
                key: checkpoint_key.to_string(),
                source,
            })?;

        manifest.push(checkpoint.entry());
        let pruned = self.retention.prune(&mut manifest);
        let manifest_bytes =
            serde_json::to_vec_pretty(&manifest).map_err(PersistenceError::serialization)?;
        if let Err(source) = self.backend.write(&manifest_key, &manifest_bytes) {
            // The payload is unreachable without the manifest entry.
            if let Err(e) = self.backend.remove(&checkpoint_key) {
                tracing::warn!("Failed to remove orphaned checkpoint {}: {}", checkpoint_key, e);
            }
            return Err(PersistenceError::PersistenceFailure {
                key: manifest_key.to_string(),
                source,
            });
        }

        self.remove_payloads(context, draft_id, &pruned);
        tracing::info!(
            checkpoint = %checkpoint.id,
            trigger = trigger.as_str(),
            bytes = checkpoint.snapshot.len(),
            pruned = pruned.len(),
            "Stored checkpoint"
        );
        Ok(draft_id)
    }

    /// Load and verify one checkpoint.
    pub(crate) fn load(
        &self,
        context: &str,
        draft_id: DraftId,
        checkpoint_id: CheckpointId,
    ) -> Result<Checkpoint> {
        let manifest = self.manifest(context, draft_id)?;
        if manifest.find(checkpoint_id).is_none() {
            return Err(PersistenceError::CheckpointNotFound {
                draft_id,
                checkpoint_id,
            });
        }
        self.read_checkpoint(context, draft_id, checkpoint_id)
    }

    /// Load the latest checkpoint of a draft.
    pub(crate) fn current(&self, context: &str, draft_id: DraftId) -> Result<Checkpoint> {
        let manifest = self.manifest(context, draft_id)?;
        let latest = manifest
            .latest()
            .ok_or_else(|| PersistenceError::InvalidDraftReference {
                draft_id,
                context: context.to_string(),
            })?;
        self.read_checkpoint(context, draft_id, latest.id)
    }

    /// Delete every checkpoint of a draft, then its manifest.
    pub(crate) fn discard(&self, context: &str, draft_id: DraftId) -> Result<usize> {
        let manifest = self.manifest(context, draft_id)?;
        let count = manifest.len();
        self.remove_payloads(context, draft_id, &manifest.entries);
        let key = self.manifest_key(context, draft_id)?;
        self.backend
            .remove(&key)
            .map_err(|source| PersistenceError::PersistenceFailure {
                key: key.to_string(),
                source,
            })?;
        tracing::info!(checkpoints = count, "Discarded draft");
        Ok(count)
    }

    fn read_checkpoint(
        &self,
        context: &str,
        draft_id: DraftId,
        checkpoint_id: CheckpointId,
    ) -> Result<Checkpoint> {
        let key = self.checkpoint_key(context, draft_id, checkpoint_id)?;
        let bytes = self
            .backend
            .read(&key)
            .map_err(|source| PersistenceError::ReadFailure {
                key: key.to_string(),
                source,
            })?
            .ok_or(PersistenceError::CheckpointNotFound {
                draft_id,
                checkpoint_id,
            })?;
        let checkpoint: Checkpoint = serde_json::from_slice(&bytes)
            .map_err(|e| PersistenceError::deserialization(key.as_str(), e))?;

        if !verify_digest(checkpoint.snapshot.as_bytes(), &checkpoint.digest) {
            return Err(PersistenceError::CorruptedCheckpoint {
                checkpoint_id,
                expected: checkpoint.digest.clone(),
                actual: checkpoint.snapshot.digest(),
            });
        }
        Ok(checkpoint)
    }

    fn remove_payloads(&self, context: &str, draft_id: DraftId, entries: &[CheckpointEntry]) {
        for entry in entries {
            let removed = self
                .checkpoint_key(context, draft_id, entry.id)
                .and_then(|key| {
                    self.backend
                        .remove(&key)
                        .map_err(|source| PersistenceError::PersistenceFailure {
                            key: key.to_string(),
                            source,
                        })
                });
            if let Err(e) = removed {
                tracing::warn!("Failed to remove checkpoint {}: {}", entry.id, e);
            }
        }
    }
}

fn invalid_context(context: &str) -> PersistenceError {
    PersistenceError::InvalidName {
        kind: "context",
        value: context.to_string(),
    }
}
