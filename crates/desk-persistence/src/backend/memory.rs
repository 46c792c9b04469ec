use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{StorageBackend, StorageKey};
use crate::error::StorageError;

/// In-memory storage backend.
///
/// Besides ephemeral sessions, this backend is the test double for the
/// persistence collaborator: it can reject writes and slow them down.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<BTreeMap<StorageKey, Vec<u8>>>,
    fail_writes: AtomicBool,
    fail_next_writes: AtomicUsize,
    fail_suffix: Mutex<Option<String>>,
    write_delay: Mutex<Option<Duration>>,
    writes: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every write until switched off again.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Reject the next `count` writes.
    pub fn fail_next_writes(&self, count: usize) {
        self.fail_next_writes.store(count, Ordering::SeqCst);
    }

    /// Reject writes to keys ending in `suffix` (e.g. `"manifest.json"`).
    pub fn fail_writes_to(&self, suffix: Option<&str>) {
        *self
            .fail_suffix
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = suffix.map(str::to_string);
    }

    /// Block every write for `delay` (simulates slow storage).
    pub fn set_write_delay(&self, delay: Option<Duration>) {
        *self
            .write_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = delay;
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// All stored keys, in order.
    pub fn keys(&self) -> Vec<StorageKey> {
        self.entries().keys().cloned().collect()
    }

    /// Overwrite a stored value without any failure simulation.
    pub fn put_raw(&self, key: StorageKey, value: Vec<u8>) {
        self.entries().insert(key, value);
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<StorageKey, Vec<u8>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn should_reject(&self, key: &StorageKey) -> bool {
        if self.fail_writes.load(Ordering::SeqCst) {
            return true;
        }
        let suffix_match = self
            .fail_suffix
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_deref()
            .is_some_and(|suffix| key.as_str().ends_with(suffix));
        if suffix_match {
            return true;
        }
        self.fail_next_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl StorageBackend for MemoryBackend {
    fn write(&self, key: &StorageKey, value: &[u8]) -> Result<(), StorageError> {
        let delay = *self
            .write_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        if self.should_reject(key) {
            return Err(StorageError::Rejected {
                key: key.to_string(),
                reason: "simulated write error".to_string(),
            });
        }
        self.entries().insert(key.clone(), value.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read(&self, key: &StorageKey) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.entries().get(key).cloned())
    }

    fn remove(&self, key: &StorageKey) -> Result<(), StorageError> {
        self.entries().remove(key);
        Ok(())
    }
}
