//! Draft checkpoint store.
//!
//! [`CheckpointStore::checkpoint`] appends an immutable snapshot to a draft's
//! history. Writes for one draft go through a dedicated queue task, so they
//! land in call order no matter how long each backend write takes. Drafts
//! don't wait on each other.
//!
//! # Example
//!
//! ```ignore
//! let store = CheckpointStore::new(Arc::new(MemoryBackend::new()));
//! let draft = store
//!     .checkpoint(None, Trigger::Manual, Snapshot::from_text("gm"), "composer")
//!     .await?;
//! store
//!     .checkpoint(Some(draft), Trigger::Automatic, Snapshot::from_text("gm nostr"), "composer")
//!     .await?;
//! let current = store.current(draft, "composer").await?;
//! ```

mod retention;
mod writer;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot};
use tracing::Instrument;

pub use retention::RetentionPolicy;
use writer::DraftWriter;

use crate::backend::{StorageBackend, is_valid_segment};
use crate::error::{PersistenceError, Result};
use crate::types::{
    Checkpoint, CheckpointEntry, CheckpointId, DraftId, Namespace, Snapshot, Trigger,
};

/// Append-only store of draft checkpoints.
///
/// Cloning is cheap; clones share the same backend and write queues.
#[derive(Clone)]
pub struct CheckpointStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    writer: DraftWriter,
    namespace: Namespace,
    retention: RetentionPolicy,
    queues: Mutex<HashMap<QueueKey, mpsc::UnboundedSender<WriteRequest>>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct QueueKey {
    context: String,
    draft_id: DraftId,
}

enum WriteRequest {
    Append {
        is_new: bool,
        trigger: Trigger,
        snapshot: Snapshot,
        reply: oneshot::Sender<Result<DraftId>>,
    },
    Discard {
        reply: oneshot::Sender<Result<usize>>,
    },
}

impl CheckpointStore {
    /// Create a store in the default namespace with the default retention.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_options(backend, Namespace::default(), RetentionPolicy::default())
    }

    pub fn with_options(
        backend: Arc<dyn StorageBackend>,
        namespace: Namespace,
        retention: RetentionPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                writer: DraftWriter::new(backend, namespace.clone(), retention),
                namespace,
                retention,
                queues: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.inner.namespace
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.inner.retention
    }

    /// Record a checkpoint of `snapshot` for a draft.
    ///
    /// With `draft_id == None` a new draft id is allocated; it is only handed
    /// back once the first checkpoint has landed. With an existing id the
    /// checkpoint is appended and the same id is returned.
    ///
    /// The request is queued before this function returns, so consecutive
    /// calls for one draft are written in call order. Await the returned
    /// [`PendingCheckpoint`] to observe completion.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn checkpoint(
        &self,
        draft_id: Option<DraftId>,
        trigger: Trigger,
        snapshot: Snapshot,
        context: &str,
    ) -> PendingCheckpoint {
        let (reply, rx) = oneshot::channel();
        if !is_valid_segment(context) {
            let _ = reply.send(Err(PersistenceError::InvalidName {
                kind: "context",
                value: context.to_string(),
            }));
            return PendingCheckpoint { rx };
        }

        let (draft_id, is_new) = match draft_id {
            Some(id) => (id, false),
            None => (DraftId::new(), true),
        };
        tracing::debug!(
            draft = %draft_id,
            context,
            trigger = trigger.as_str(),
            is_new,
            "Queueing checkpoint"
        );
        self.enqueue(
            QueueKey {
                context: context.to_string(),
                draft_id,
            },
            WriteRequest::Append {
                is_new,
                trigger,
                snapshot,
                reply,
            },
        );
        PendingCheckpoint { rx }
    }

    /// Delete a draft and all of its checkpoints.
    ///
    /// Runs after any checkpoint already queued for the draft. Returns the
    /// number of checkpoints removed.
    pub async fn discard(&self, draft_id: DraftId, context: &str) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        self.enqueue(
            QueueKey {
                context: context.to_string(),
                draft_id,
            },
            WriteRequest::Discard { reply },
        );
        rx.await.unwrap_or(Err(PersistenceError::QueueClosed))
    }

    /// The most recent checkpoint of a draft, manual or automatic.
    pub async fn current(&self, draft_id: DraftId, context: &str) -> Result<Checkpoint> {
        let writer = self.inner.writer.clone();
        let context = context.to_string();
        run_blocking(move || writer.current(&context, draft_id)).await
    }

    /// Checkpoint entries of a draft, oldest first.
    pub async fn history(&self, draft_id: DraftId, context: &str) -> Result<Vec<CheckpointEntry>> {
        let writer = self.inner.writer.clone();
        let context = context.to_string();
        run_blocking(move || writer.manifest(&context, draft_id).map(|m| m.entries)).await
    }

    /// Load one checkpoint, verifying its digest.
    pub async fn load(
        &self,
        draft_id: DraftId,
        context: &str,
        checkpoint_id: CheckpointId,
    ) -> Result<Checkpoint> {
        let writer = self.inner.writer.clone();
        let context = context.to_string();
        run_blocking(move || writer.load(&context, draft_id, checkpoint_id)).await
    }

    fn enqueue(&self, key: QueueKey, request: WriteRequest) {
        let mut queues = self.inner.queues();
        let request = match queues.get(&key) {
            Some(tx) => match tx.send(request) {
                Ok(()) => return,
                Err(mpsc::error::SendError(request)) => request,
            },
            None => request,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let span = tracing::info_span!("draft", draft = %key.draft_id, context = %key.context);
        tokio::spawn(run_queue(Arc::clone(&self.inner), key.clone(), rx).instrument(span));
        // The receiver is alive, so this only fails if the task died already,
        // in which case the caller sees `QueueClosed`.
        let _ = tx.send(request);
        queues.insert(key, tx);
    }
}

impl StoreInner {
    fn queues(&self) -> MutexGuard<'_, HashMap<QueueKey, mpsc::UnboundedSender<WriteRequest>>> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Next queued request, or `None` after unregistering the drained queue.
    ///
    /// Senders only push while holding the `queues` lock, so an empty queue
    /// seen under that lock stays empty and the next `enqueue` respawns.
    fn next_request(
        &self,
        key: &QueueKey,
        rx: &mut mpsc::UnboundedReceiver<WriteRequest>,
    ) -> Option<WriteRequest> {
        let mut queues = self.queues();
        match rx.try_recv() {
            Ok(request) => Some(request),
            Err(_) => {
                queues.remove(key);
                None
            }
        }
    }
}

/// Process one draft's writes strictly one after another.
///
/// The task exits as soon as its queue is empty.
async fn run_queue(
    inner: Arc<StoreInner>,
    key: QueueKey,
    mut rx: mpsc::UnboundedReceiver<WriteRequest>,
) {
    while let Some(request) = inner.next_request(&key, &mut rx) {
        match request {
            WriteRequest::Append {
                is_new,
                trigger,
                snapshot,
                reply,
            } => {
                let writer = inner.writer.clone();
                let context = key.context.clone();
                let draft_id = key.draft_id;
                let result = run_blocking(move || {
                    writer.append(&context, draft_id, is_new, trigger, snapshot)
                })
                .await;
                if let Err(e) = &result {
                    tracing::warn!(trigger = trigger.as_str(), "Checkpoint failed: {}", e);
                }
                let _ = reply.send(result);
            }
            WriteRequest::Discard { reply } => {
                let writer = inner.writer.clone();
                let context = key.context.clone();
                let draft_id = key.draft_id;
                let result = run_blocking(move || writer.discard(&context, draft_id)).await;
                let _ = reply.send(result);
            }
        }
    }
    tracing::trace!("Checkpoint queue drained");
}

async fn run_blocking<T, F>(task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let span = tracing::Span::current();
    tokio::task::spawn_blocking(move || span.in_scope(task))
        .await
        .map_err(|source| PersistenceError::BackgroundTask { source })?
}

/// Completion handle for a queued checkpoint.
///
/// Resolves to the draft id once the checkpoint has been durably recorded.
#[must_use = "a checkpoint failure is only reported through this handle"]
pub struct PendingCheckpoint {
    rx: oneshot::Receiver<Result<DraftId>>,
}

impl Future for PendingCheckpoint {
    type Output = Result<DraftId>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|reply| reply.unwrap_or(Err(PersistenceError::QueueClosed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn memory_store() -> (Arc<MemoryBackend>, CheckpointStore) {
        let backend = Arc::new(MemoryBackend::new());
        let store = CheckpointStore::new(backend.clone());
        (backend, store)
    }

    #[tokio::test]
    async fn test_new_draft_gets_id() {
        let (_, store) = memory_store();
        let draft = store
            .checkpoint(None, Trigger::Manual, Snapshot::from_text("gm"), "composer")
            .await
            .unwrap();

        let current = store.current(draft, "composer").await.unwrap();
        assert_eq!(current.draft_id, draft);
        assert_eq!(current.snapshot.as_text(), Some("gm"));
        assert!(current.is_manual());
    }

    #[tokio::test]
    async fn test_invalid_context_rejected() {
        let (_, store) = memory_store();
        let result = store
            .checkpoint(None, Trigger::Manual, Snapshot::from_text("x"), "../etc")
            .await;
        assert!(matches!(result, Err(PersistenceError::InvalidName { .. })));
    }

    #[tokio::test]
    async fn test_failed_first_checkpoint_returns_no_id() {
        let (backend, store) = memory_store();
        backend.fail_next_writes(1);

        let result = store
            .checkpoint(None, Trigger::Automatic, Snapshot::from_text("x"), "composer")
            .await;

        assert!(matches!(
            result,
            Err(PersistenceError::PersistenceFailure { .. })
        ));
        assert!(backend.keys().is_empty());
    }

    #[tokio::test]
    async fn test_manifest_failure_removes_orphaned_payload() {
        let (backend, store) = memory_store();
        let draft = store
            .checkpoint(None, Trigger::Manual, Snapshot::from_text("one"), "composer")
            .await
            .unwrap();
        let keys_before = backend.keys();

        backend.fail_writes_to(Some("manifest.json"));
        let result = store
            .checkpoint(Some(draft), Trigger::Manual, Snapshot::from_text("two"), "composer")
            .await;
        assert!(matches!(
            result,
            Err(PersistenceError::PersistenceFailure { .. })
        ));
        assert_eq!(backend.keys(), keys_before);

        backend.fail_writes_to(None);
        let history = store.history(draft, "composer").await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_discard_removes_everything() {
        let (backend, store) = memory_store();
        let draft = store
            .checkpoint(None, Trigger::Manual, Snapshot::from_text("a"), "composer")
            .await
            .unwrap();
        store
            .checkpoint(Some(draft), Trigger::Automatic, Snapshot::from_text("ab"), "composer")
            .await
            .unwrap();

        assert_eq!(store.discard(draft, "composer").await.unwrap(), 2);
        assert!(backend.keys().is_empty());
        assert!(matches!(
            store.current(draft, "composer").await,
            Err(PersistenceError::InvalidDraftReference { .. })
        ));
    }

    fn open_queues(store: &CheckpointStore) -> usize {
        store.inner.queues().len()
    }

    #[tokio::test]
    async fn test_queues_released_after_discard() {
        let (backend, store) = memory_store();
        for i in 0..100 {
            let draft = store
                .checkpoint(None, Trigger::Manual, Snapshot::from_text(&i.to_string()), "composer")
                .await
                .unwrap();
            store.discard(draft, "composer").await.unwrap();
        }
        tokio::task::yield_now().await;

        assert_eq!(open_queues(&store), 0);
        assert!(backend.keys().is_empty());
    }

    #[tokio::test]
    async fn test_idle_queue_respawns_on_next_checkpoint() {
        let (_, store) = memory_store();
        let draft = store
            .checkpoint(None, Trigger::Manual, Snapshot::from_text("a"), "composer")
            .await
            .unwrap();
        tokio::task::yield_now().await;
        assert_eq!(open_queues(&store), 0);

        let first = store.checkpoint(
            Some(draft),
            Trigger::Automatic,
            Snapshot::from_text("ab"),
            "composer",
        );
        let second = store.checkpoint(
            Some(draft),
            Trigger::Automatic,
            Snapshot::from_text("abc"),
            "composer",
        );
        assert_eq!(first.await.unwrap(), draft);
        assert_eq!(second.await.unwrap(), draft);

        let current = store.current(draft, "composer").await.unwrap();
        assert_eq!(current.snapshot.as_text(), Some("abc"));
        assert_eq!(store.history(draft, "composer").await.unwrap().len(), 3);
    }
}
