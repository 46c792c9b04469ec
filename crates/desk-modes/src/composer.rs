//! Comment composer with debounced autosave.
//!
//! A [`ComposerSession`] connects the comment mode's [`ComposerDraft`] state
//! to the checkpoint store:
//!
//! 1. [`ComposerSession::edit`] mutates the draft and pushes a copy into a
//!    [`DebouncedCell`].
//! 2. When the cell commits, a background task takes an automatic checkpoint
//!    and writes the returned draft id back into the mode state.
//! 3. [`ComposerSession::save`] drops any pending autosave and takes a manual
//!    checkpoint, reporting failures to the caller.
//!
//! Saves of one session never overlap, so the first checkpoint of a new
//! draft always finishes (and records its id) before the next one starts.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use desk_common::DebouncedCell;
use desk_persistence::{
    AutoSaveConfig, CheckpointStore, DirtyTracker, DraftId, PersistenceError, Trigger,
};

use crate::catalog::{ComposerDraft, names};
use crate::registry::{ModeError, ModeRegistry};
use crate::state::StateContainer;

/// Checkpoint context used by composer sessions.
pub const COMPOSER_CONTEXT: &str = "composer";

/// Composer session error.
#[derive(Debug, Error)]
pub enum ComposerError {
    /// The mode state holds something other than a [`ComposerDraft`].
    #[error("Mode state does not hold a composer draft")]
    NotAComposer,

    #[error(transparent)]
    Mode(#[from] ModeError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl ComposerError {
    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotAComposer => "This panel can't hold a draft.".to_string(),
            Self::Mode(e) => e.user_message(),
            Self::Persistence(e) => e.user_message(),
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::NotAComposer => None,
            Self::Mode(e) => e.suggestion(),
            Self::Persistence(e) => e.suggestion(),
        }
    }
}

/// What the autosave machinery is doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutosaveStatus {
    /// No edits yet.
    Idle,
    /// Unsaved edits are waiting for the debounce window.
    Pending,
    /// A checkpoint is being written.
    Saving,
    /// Everything up to the latest edit is stored.
    Saved { draft_id: DraftId, trigger: Trigger },
    /// The last save failed; edits are kept in memory.
    Failed { manual: bool },
}

impl AutosaveStatus {
    /// True when no save is running or scheduled.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Idle | Self::Saved { .. } | Self::Failed { .. })
    }
}

/// A draft copy queued in the debounce cell, tagged with its edit number.
#[derive(Debug, Clone)]
struct Settled {
    seq: u64,
    draft: ComposerDraft,
}

struct Progress {
    tracker: DirtyTracker,
    /// Number of edits applied so far.
    edit_seq: u64,
    /// Edit number of the newest stored checkpoint.
    saved_seq: u64,
}

struct SessionInner {
    store: CheckpointStore,
    state: StateContainer,
    context: String,
    config: AutoSaveConfig,
    save_lock: tokio::sync::Mutex<()>,
    progress: Mutex<Progress>,
    status: watch::Sender<AutosaveStatus>,
}

/// Autosaving editor over a [`ComposerDraft`] state container.
pub struct ComposerSession {
    inner: Arc<SessionInner>,
    cell: DebouncedCell<Option<Settled>>,
    worker: JoinHandle<()>,
}

impl ComposerSession {
    /// Start a session over `state`, which must hold a [`ComposerDraft`].
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn new(
        store: CheckpointStore,
        state: StateContainer,
        config: AutoSaveConfig,
    ) -> Result<Self, ComposerError> {
        Self::with_context(store, state, config, COMPOSER_CONTEXT)
    }

    /// Like [`ComposerSession::new`], storing checkpoints under `context`.
    pub fn with_context(
        store: CheckpointStore,
        state: StateContainer,
        config: AutoSaveConfig,
        context: &str,
    ) -> Result<Self, ComposerError> {
        if !state.holds::<ComposerDraft>() {
            return Err(ComposerError::NotAComposer);
        }

        let (status, _) = watch::channel(AutosaveStatus::Idle);
        let inner = Arc::new(SessionInner {
            store,
            state,
            context: context.to_string(),
            config,
            save_lock: tokio::sync::Mutex::new(()),
            progress: Mutex::new(Progress {
                tracker: DirtyTracker::new(),
                edit_seq: 0,
                saved_seq: 0,
            }),
            status,
        });
        let cell = DebouncedCell::new(None, config.debounce());
        let worker = tokio::spawn(run_autosave(Arc::clone(&inner), cell.subscribe()));

        tracing::debug!(
            context,
            enabled = config.enabled,
            debounce_ms = config.debounce_ms,
            max_delay_ms = config.max_delay_ms,
            "Composer session started"
        );
        Ok(Self {
            inner,
            cell,
            worker,
        })
    }

    /// Activate the comment mode of `registry` and start a session on it.
    pub fn open(
        registry: &ModeRegistry,
        store: CheckpointStore,
        config: AutoSaveConfig,
    ) -> Result<Self, ComposerError> {
        let active = registry.activate(names::COMMENT)?;
        Self::new(store, active.state().clone(), config)
    }

    /// Apply an edit to the draft and schedule an autosave.
    pub fn edit<R>(&self, f: impl FnOnce(&mut ComposerDraft) -> R) -> Result<R, ComposerError> {
        let (result, draft) = self
            .inner
            .state
            .update(|draft: &mut ComposerDraft| {
                let result = f(draft);
                (result, draft.clone())
            })
            .ok_or(ComposerError::NotAComposer)?;

        let config = self.inner.config;
        let (seq, force) = {
            let mut progress = self.inner.progress();
            progress.edit_seq += 1;
            progress.tracker.mark_dirty();
            self.inner.status.send_replace(AutosaveStatus::Pending);
            (
                progress.edit_seq,
                progress.tracker.should_force_save(&config),
            )
        };

        if config.enabled {
            self.cell.update(Some(Settled { seq, draft }));
            if force {
                tracing::debug!(seq, "Max autosave delay reached, flushing");
                self.cell.flush();
            }
        }
        Ok(result)
    }

    /// Take a manual checkpoint of the current draft.
    ///
    /// Any pending autosave is dropped; the manual checkpoint covers it.
    pub async fn save(&self) -> Result<DraftId, ComposerError> {
        self.cell.cancel();
        let _guard = self.inner.save_lock.lock().await;
        let seq = self.inner.progress().edit_seq;
        let draft = self
            .inner
            .state
            .get::<ComposerDraft>()
            .ok_or(ComposerError::NotAComposer)?;
        Ok(self.inner.checkpoint(Trigger::Manual, seq, &draft).await?)
    }

    /// The draft id, once the first checkpoint has been stored.
    pub fn draft_id(&self) -> Option<DraftId> {
        self.inner
            .state
            .read(|draft: &ComposerDraft| draft.draft_id)
            .flatten()
    }

    /// Copy of the current draft.
    pub fn draft(&self) -> Option<ComposerDraft> {
        self.inner.state.get()
    }

    pub fn state(&self) -> &StateContainer {
        &self.inner.state
    }

    pub fn context(&self) -> &str {
        &self.inner.context
    }

    pub fn status(&self) -> AutosaveStatus {
        self.inner.status.borrow().clone()
    }

    /// Receiver notified on every status change.
    pub fn subscribe_status(&self) -> watch::Receiver<AutosaveStatus> {
        self.inner.status.subscribe()
    }

    /// True if there are edits that haven't been stored yet.
    pub fn is_dirty(&self) -> bool {
        self.inner.progress().tracker.is_dirty()
    }

    /// True when an automatic save failed and edits are still unsaved.
    ///
    /// The user should be asked to save manually.
    pub fn needs_manual_save(&self) -> bool {
        let progress = self.inner.progress();
        progress.tracker.is_dirty() && progress.tracker.last_auto_save_failed()
    }
}

impl Drop for ComposerSession {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

impl SessionInner {
    fn progress(&self) -> MutexGuard<'_, Progress> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn save_automatic(&self, settled: Settled) {
        let _guard = self.save_lock.lock().await;
        if settled.seq <= self.progress().saved_seq {
            tracing::trace!(seq = settled.seq, "Skipping superseded autosave");
            return;
        }
        // Failures are recorded in the status; nobody awaits an autosave.
        let _ = self
            .checkpoint(Trigger::Automatic, settled.seq, &settled.draft)
            .await;
    }

    /// Store `draft` (taken at edit number `seq`). Callers hold `save_lock`.
    async fn checkpoint(
        &self,
        trigger: Trigger,
        seq: u64,
        draft: &ComposerDraft,
    ) -> Result<DraftId, PersistenceError> {
        let draft_id = self
            .state
            .read(|draft: &ComposerDraft| draft.draft_id)
            .flatten();

        {
            let mut progress = self.progress();
            progress.tracker.start_save();
            self.status.send_replace(AutosaveStatus::Saving);
        }

        let result = match draft.snapshot() {
            Ok(snapshot) => {
                self.store
                    .checkpoint(draft_id, trigger, snapshot, &self.context)
                    .await
            }
            Err(e) => Err(e),
        };

        if let Ok(id) = &result {
            let id = *id;
            self.state
                .update(|draft: &mut ComposerDraft| draft.draft_id = Some(id));
        }

        let mut progress = self.progress();
        match &result {
            Ok(id) => {
                progress.saved_seq = progress.saved_seq.max(seq);
                let clean = progress.edit_seq == seq;
                progress.tracker.save_complete(clean);
                self.status.send_replace(if clean {
                    AutosaveStatus::Saved {
                        draft_id: *id,
                        trigger,
                    }
                } else {
                    AutosaveStatus::Pending
                });
                tracing::info!(draft = %id, trigger = trigger.as_str(), clean, "Draft saved");
            }
            Err(e) => {
                progress.tracker.save_failed(trigger.is_manual());
                self.status.send_replace(AutosaveStatus::Failed {
                    manual: trigger.is_manual(),
                });
                tracing::warn!(trigger = trigger.as_str(), "Failed to save draft: {}", e);
            }
        }
        result
    }
}

async fn run_autosave(inner: Arc<SessionInner>, mut rx: watch::Receiver<Option<Settled>>) {
    while rx.changed().await.is_ok() {
        let settled = rx.borrow_and_update().clone();
        if let Some(settled) = settled {
            inner.save_automatic(settled).await;
        }
    }
    tracing::trace!("Autosave worker stopped");
}
