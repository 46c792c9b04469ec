//! Trailing-edge debounced value cell.
//!
//! A [`DebouncedCell`] holds a committed value plus a single pending slot.
//! Every [`DebouncedCell::update`] replaces the pending value and restarts the
//! delay window; only the last value written before the window elapses is
//! committed. Commits always happen on a scheduled task, never inside
//! `update`, even when the delay is zero.
//!
//! # Example
//!
//! ```ignore
//! let cell = DebouncedCell::new(String::new(), Duration::from_millis(300));
//! cell.update("h".to_string());
//! cell.update("hi".to_string());
//! // ~300ms later: cell.committed() == "hi", cell.is_busy() == false
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Value cell that coalesces rapid updates into one delayed commit.
///
/// The cell is owned by whichever component creates it. Dropping it cancels
/// any unfired commit.
pub struct DebouncedCell<T> {
    shared: Arc<Shared<T>>,
    delay: Duration,
    runtime: Handle,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    committed: watch::Sender<T>,
}

struct Slot<T> {
    /// Value waiting for its timer.
    pending: Option<T>,
    /// The single scheduled commit, if any.
    timer: Option<JoinHandle<()>>,
    /// Bumped on every update/cancel/flush so stale timers become no-ops.
    epoch: u64,
    commits: u64,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn commit_if_current(&self, epoch: u64) {
        let mut slot = self.lock();
        if slot.epoch != epoch {
            return;
        }
        slot.timer = None;
        if let Some(value) = slot.pending.take() {
            slot.commits += 1;
            self.committed.send_replace(value);
            tracing::trace!(commits = slot.commits, "debounced value committed");
        }
    }
}

impl<T> Slot<T> {
    fn invalidate(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl<T> DebouncedCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a cell on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn new(initial: T, delay: Duration) -> Self {
        Self::with_handle(initial, delay, Handle::current())
    }

    /// Create a cell whose commit timers run on `runtime`.
    pub fn with_handle(initial: T, delay: Duration, runtime: Handle) -> Self {
        let (committed, _) = watch::channel(initial);
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    pending: None,
                    timer: None,
                    epoch: 0,
                    commits: 0,
                }),
                committed,
            }),
            delay,
            runtime,
        }
    }

    /// Queue `value` for commit, superseding any pending value.
    ///
    /// Restarts the delay window. Never commits synchronously.
    pub fn update(&self, value: T) {
        let mut slot = self.shared.lock();
        slot.pending = Some(value);
        slot.invalidate();
        let epoch = slot.epoch;
        let shared = Arc::clone(&self.shared);
        let delay = self.delay;
        slot.timer = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            shared.commit_if_current(epoch);
        }));
    }

    /// Drop the pending value without committing it.
    ///
    /// Returns the discarded value, if there was one.
    pub fn cancel(&self) -> Option<T> {
        let mut slot = self.shared.lock();
        slot.invalidate();
        slot.pending.take()
    }

    /// Commit the pending value right away.
    ///
    /// Returns `true` if a value was committed.
    pub fn flush(&self) -> bool {
        let mut slot = self.shared.lock();
        slot.invalidate();
        match slot.pending.take() {
            Some(value) => {
                slot.commits += 1;
                self.shared.committed.send_replace(value);
                true
            }
            None => false,
        }
    }

    /// Last committed value.
    pub fn committed(&self) -> T {
        self.shared.committed.borrow().clone()
    }

    /// Value waiting for commit, if any.
    pub fn pending(&self) -> Option<T> {
        self.shared.lock().pending.clone()
    }

    /// True between an update and its commit or cancellation.
    pub fn is_busy(&self) -> bool {
        self.shared.lock().pending.is_some()
    }

    /// Receiver notified on every commit.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.shared.committed.subscribe()
    }

    /// Number of commits performed so far.
    pub fn commit_count(&self) -> u64 {
        self.shared.lock().commits
    }

    /// Length of the quiet window before a commit.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl<T> Drop for DebouncedCell<T> {
    fn drop(&mut self) {
        self.shared.lock().invalidate();
    }
}
