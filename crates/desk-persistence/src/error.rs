//! Persistence error types.
//!
//! Backends report [`StorageError`]; the checkpoint store wraps those into
//! [`PersistenceError`], which carries user-facing messages and optional
//! remediation hints.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{CheckpointId, DraftId};

/// Error raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// File I/O error.
    #[error("Failed to {operation} {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Atomic write failed (temp file couldn't be renamed).
    #[error("Failed to complete write to {target_path}")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backend refused the write.
    #[error("Write to {key} rejected: {reason}")]
    Rejected { key: String, reason: String },

    /// A key segment is empty or not path-safe.
    #[error("Invalid storage key segment {segment:?}")]
    InvalidKey { segment: String },
}

/// Checkpoint store error.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The backend failed to record a write.
    #[error("Failed to persist {key}")]
    PersistenceFailure {
        key: String,
        #[source]
        source: StorageError,
    },

    /// The backend failed to read a record.
    #[error("Failed to read {key}")]
    ReadFailure {
        key: String,
        #[source]
        source: StorageError,
    },

    /// The draft id is unknown to the backend.
    #[error("Unknown draft {draft_id} in context {context}")]
    InvalidDraftReference { draft_id: DraftId, context: String },

    /// The draft exists but does not hold the requested checkpoint.
    #[error("Checkpoint {checkpoint_id} not found in draft {draft_id}")]
    CheckpointNotFound {
        draft_id: DraftId,
        checkpoint_id: CheckpointId,
    },

    /// A namespace or context name can't be used as a storage key.
    #[error("Invalid {kind} name {value:?}")]
    InvalidName { kind: &'static str, value: String },

    /// Serialization error.
    #[error("Failed to serialize draft data")]
    Serialization {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Deserialization error.
    #[error("Failed to deserialize {key}")]
    Deserialization {
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Manifest written by a newer schema.
    #[error("Draft manifest version {found} is not supported (maximum: {max_supported})")]
    UnsupportedVersion {
        found: u32,
        max_supported: u32,
        key: String,
    },

    /// Stored snapshot bytes don't match the recorded digest.
    #[error("Checkpoint {checkpoint_id} is corrupted")]
    CorruptedCheckpoint {
        checkpoint_id: CheckpointId,
        expected: String,
        actual: String,
    },

    /// The write queue for a draft stopped before answering.
    #[error("Checkpoint queue closed before the write completed")]
    QueueClosed,

    /// A blocking storage task panicked or was cancelled.
    #[error("Background storage task failed")]
    BackgroundTask {
        #[source]
        source: tokio::task::JoinError,
    },
}

impl PersistenceError {
    pub(crate) fn serialization(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Serialization {
            source: Box::new(source),
        }
    }

    pub(crate) fn deserialization(
        key: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Deserialization {
            key: key.into(),
            source: Box::new(source),
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PersistenceFailure { .. } | Self::ReadFailure { .. } | Self::QueueClosed
        )
    }

    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::PersistenceFailure { .. } => {
                "Your draft could not be saved.".to_string()
            }
            Self::ReadFailure { .. } => "Your draft could not be loaded.".to_string(),
            Self::InvalidDraftReference { draft_id, .. } => {
                format!("The draft {} no longer exists.", draft_id)
            }
            Self::CheckpointNotFound { checkpoint_id, .. } => {
                format!("The saved version {} could not be found.", checkpoint_id)
            }
            Self::InvalidName { kind, value } => {
                format!("'{}' is not a valid {} name.", value, kind)
            }
            Self::Serialization { .. } => {
                "An error occurred while preparing the draft for saving.".to_string()
            }
            Self::Deserialization { .. } => {
                "An error occurred while reading the draft. The saved data may be corrupted."
                    .to_string()
            }
            Self::UnsupportedVersion {
                found,
                max_supported,
                ..
            } => {
                format!(
                    "This draft was saved by a newer version of Draftdesk \
                    (format version {}, your version supports up to {}).",
                    found, max_supported
                )
            }
            Self::CorruptedCheckpoint { .. } => {
                "A saved version of this draft is damaged and can't be restored.".to_string()
            }
            Self::QueueClosed | Self::BackgroundTask { .. } => {
                "Saving was interrupted.".to_string()
            }
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::PersistenceFailure { .. } => Some(
                "Try saving again. Check disk space and permissions if it keeps failing.".into(),
            ),
            Self::ReadFailure { .. } => {
                Some("Check that the storage location is reachable and readable.".into())
            }
            Self::InvalidDraftReference { .. } => {
                Some("Start a new draft; the old one may have been deleted.".into())
            }
            Self::CheckpointNotFound { .. } => {
                Some("Pick another version from the draft history.".into())
            }
            Self::InvalidName { .. } => {
                Some("Use letters, digits, '-', '_' or '.' only.".into())
            }
            Self::Serialization { .. } => None,
            Self::Deserialization { .. } | Self::CorruptedCheckpoint { .. } => {
                Some("Restore an earlier version from the draft history.".into())
            }
            Self::UnsupportedVersion { .. } => {
                Some("Update Draftdesk to the latest version.".into())
            }
            Self::QueueClosed | Self::BackgroundTask { .. } => {
                Some("Save the draft manually.".into())
            }
        }
    }
}

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_failures_are_retryable() {
        let error = PersistenceError::PersistenceFailure {
            key: "local/composer/x/manifest.json".into(),
            source: StorageError::Rejected {
                key: "local/composer/x/manifest.json".into(),
                reason: "offline".into(),
            },
        };
        assert!(error.is_retryable());
        assert!(error.suggestion().is_some());
    }

    #[test]
    fn test_invalid_reference_is_not_retryable() {
        let error = PersistenceError::InvalidDraftReference {
            draft_id: DraftId::new(),
            context: "composer".into(),
        };
        assert!(!error.is_retryable());
        assert!(error.user_message().contains("no longer exists"));
    }
}
