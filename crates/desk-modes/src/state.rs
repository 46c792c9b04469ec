//! Type-erased reactive state for modes.
//!
//! Each mode owns one [`StateContainer`] holding a value of the mode's own
//! state type. Containers are cheap to clone; clones refer to the same
//! instance. Every mutation bumps a revision counter that subscribers can
//! watch.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::watch;

type AnyState = Box<dyn Any + Send + Sync>;

/// Shared, isolated state of one mode instance.
#[derive(Clone)]
pub struct StateContainer {
    inner: Arc<Inner>,
}

struct Inner {
    value: RwLock<Option<AnyState>>,
    /// No-op containers ignore every write.
    writable: bool,
    revision: watch::Sender<u64>,
}

impl StateContainer {
    /// Create a container holding `value`.
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self::build(Some(Box::new(value)), true)
    }

    /// Create a container that holds nothing and ignores writes.
    ///
    /// Handed out for modes that don't declare any state.
    pub fn noop() -> Self {
        Self::build(None, false)
    }

    fn build(value: Option<AnyState>, writable: bool) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                value: RwLock::new(value),
                writable,
                revision,
            }),
        }
    }

    /// Mutate the state in place.
    ///
    /// Returns `None` (and leaves the revision alone) if the container does
    /// not hold a `T`.
    pub fn update<T, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R>
    where
        T: Any,
    {
        let mut guard = self
            .inner
            .value
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let state = guard.as_mut()?.downcast_mut::<T>()?;
        let result = f(state);
        self.bump();
        Some(result)
    }

    /// Read the state.
    pub fn read<T, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R>
    where
        T: Any,
    {
        let guard = self
            .inner
            .value
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        guard.as_ref()?.downcast_ref::<T>().map(f)
    }

    /// Clone the state out.
    pub fn get<T>(&self) -> Option<T>
    where
        T: Any + Clone,
    {
        self.read(T::clone)
    }

    /// Replace the whole value, possibly with a different type.
    ///
    /// Returns `false` on a no-op container.
    pub fn replace<T>(&self, value: T) -> bool
    where
        T: Any + Send + Sync,
    {
        if !self.inner.writable {
            return false;
        }
        *self
            .inner
            .value
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Box::new(value));
        self.bump();
        true
    }

    /// True if the container currently holds a `T`.
    pub fn holds<T: Any>(&self) -> bool {
        self.read(|_: &T| ()).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.inner
            .value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Number of mutations applied so far.
    pub fn revision(&self) -> u64 {
        *self.inner.revision.borrow()
    }

    /// Receiver notified with the new revision after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// True if both handles point at the same instance.
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn bump(&self) {
        self.inner.revision.send_modify(|revision| *revision += 1);
    }
}

impl fmt::Debug for StateContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateContainer")
            .field("empty", &self.is_empty())
            .field("writable", &self.inner.writable)
            .field("revision", &self.revision())
            .finish()
    }
}
