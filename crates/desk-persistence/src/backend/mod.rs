//! Storage abstraction consumed by the checkpoint store.
//!
//! The store only needs keyed reads and writes. Keys are `/`-separated
//! path-safe segments:
//!
//! ```text
//! <namespace>/<context>/<draft-id>/manifest.json
//! <namespace>/<context>/<draft-id>/checkpoints/<checkpoint-id>.json
//! ```
//!
//! - [`MemoryBackend`]: in-process storage for tests and ephemeral sessions
//! - [`FileBackend`]: one file per key under a root directory, written atomically

mod file;
mod memory;

use std::fmt;

pub use file::FileBackend;
pub use memory::MemoryBackend;

use crate::error::StorageError;

/// Abstract interface for raw keyed storage.
///
/// Implementations are called from blocking worker threads, so they may
/// perform synchronous I/O.
pub trait StorageBackend: Send + Sync {
    /// Durably record `value` under `key`, replacing any previous value.
    fn write(&self, key: &StorageKey, value: &[u8]) -> Result<(), StorageError>;

    /// Read the value stored under `key`.
    ///
    /// Returns `Ok(None)` if nothing is stored there.
    fn read(&self, key: &StorageKey) -> Result<Option<Vec<u8>>, StorageError>;

    /// Delete the value under `key`. Removing a missing key is not an error.
    fn remove(&self, key: &StorageKey) -> Result<(), StorageError>;
}

/// A validated storage key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey(String);

impl StorageKey {
    /// Build a key from path-safe segments.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, StorageError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut key = String::new();
        for segment in segments {
            let segment = segment.as_ref();
            if !is_valid_segment(segment) {
                return Err(StorageError::InvalidKey {
                    segment: segment.to_string(),
                });
            }
            if !key.is_empty() {
                key.push('/');
            }
            key.push_str(segment);
        }
        if key.is_empty() {
            return Err(StorageError::InvalidKey {
                segment: String::new(),
            });
        }
        Ok(Self(key))
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// True if `segment` can be used as one component of a storage key.
pub fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
