//! Integration tests for the checkpoint store over the memory backend.

use std::sync::Arc;
use std::time::Duration;

use desk_persistence::{
    CheckpointStore, MemoryBackend, Namespace, PersistenceError, RetentionPolicy, Snapshot,
    StorageKey, Trigger,
};
use proptest::prelude::*;

const CONTEXT: &str = "composer";

fn memory_store() -> (Arc<MemoryBackend>, CheckpointStore) {
    let backend = Arc::new(MemoryBackend::new());
    let store = CheckpointStore::new(backend.clone());
    (backend, store)
}

fn text(body: &str) -> Snapshot {
    Snapshot::from_text(body)
}

#[tokio::test]
async fn manual_then_automatic_share_draft_id() {
    let (_, store) = memory_store();

    let first = store
        .checkpoint(None, Trigger::Manual, text("s1"), CONTEXT)
        .await
        .unwrap();
    let second = store
        .checkpoint(Some(first), Trigger::Automatic, text("s2"), CONTEXT)
        .await
        .unwrap();

    assert_eq!(first, second);
    let history = store.history(first, CONTEXT).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].trigger, Trigger::Manual);
    assert_eq!(history[1].trigger, Trigger::Automatic);

    let current = store.current(first, CONTEXT).await.unwrap();
    assert_eq!(current.snapshot.as_text(), Some("s2"));
}

#[tokio::test]
async fn writes_land_in_call_order_despite_latency() {
    let (backend, store) = memory_store();
    let draft = store
        .checkpoint(None, Trigger::Manual, text("v0"), CONTEXT)
        .await
        .unwrap();

    backend.set_write_delay(Some(Duration::from_millis(5)));
    let pending: Vec<_> = (1..=8)
        .map(|i| store.checkpoint(Some(draft), Trigger::Automatic, text(&format!("v{i}")), CONTEXT))
        .collect();
    for handle in pending.into_iter().rev() {
        assert_eq!(handle.await.unwrap(), draft);
    }

    let history = store.history(draft, CONTEXT).await.unwrap();
    let bodies: Vec<String> = {
        let mut bodies = Vec::new();
        for entry in &history {
            let checkpoint = store.load(draft, CONTEXT, entry.id).await.unwrap();
            bodies.push(checkpoint.snapshot.as_text().unwrap().to_string());
        }
        bodies
    };
    let expected: Vec<String> = (0..=8).map(|i| format!("v{i}")).collect();
    assert_eq!(bodies, expected);
}

#[tokio::test]
async fn unknown_draft_is_invalid_reference() {
    let (_, store) = memory_store();
    let unknown = desk_persistence::DraftId::new();

    let result = store
        .checkpoint(Some(unknown), Trigger::Automatic, text("x"), CONTEXT)
        .await;
    assert!(matches!(
        result,
        Err(PersistenceError::InvalidDraftReference { draft_id, .. }) if draft_id == unknown
    ));
}

#[tokio::test]
async fn drafts_are_scoped_by_context() {
    let (_, store) = memory_store();
    let draft = store
        .checkpoint(None, Trigger::Manual, text("x"), CONTEXT)
        .await
        .unwrap();

    assert!(matches!(
        store.current(draft, "curation").await,
        Err(PersistenceError::InvalidDraftReference { .. })
    ));
}

#[tokio::test]
async fn namespaces_are_isolated() {
    let backend = Arc::new(MemoryBackend::new());
    let alice = CheckpointStore::with_options(
        backend.clone(),
        Namespace::new("alice").unwrap(),
        RetentionPolicy::default(),
    );
    let bob = CheckpointStore::with_options(
        backend.clone(),
        Namespace::new("bob").unwrap(),
        RetentionPolicy::default(),
    );

    let draft = alice
        .checkpoint(None, Trigger::Manual, text("secret"), CONTEXT)
        .await
        .unwrap();

    assert!(bob.current(draft, CONTEXT).await.is_err());
    assert!(
        backend
            .keys()
            .iter()
            .all(|key| key.as_str().starts_with("alice/"))
    );
}

#[tokio::test]
async fn retry_after_failure_appends_to_same_draft() {
    let (backend, store) = memory_store();
    let draft = store
        .checkpoint(None, Trigger::Manual, text("a"), CONTEXT)
        .await
        .unwrap();

    backend.fail_next_writes(1);
    let failed = store
        .checkpoint(Some(draft), Trigger::Automatic, text("ab"), CONTEXT)
        .await;
    let error = failed.unwrap_err();
    assert!(error.is_retryable());

    let retried = store
        .checkpoint(Some(draft), Trigger::Automatic, text("ab"), CONTEXT)
        .await
        .unwrap();
    assert_eq!(retried, draft);
    assert_eq!(store.history(draft, CONTEXT).await.unwrap().len(), 2);
}

#[tokio::test]
async fn failed_first_checkpoint_leaves_no_draft() {
    let (backend, store) = memory_store();
    backend.set_fail_writes(true);

    let result = store
        .checkpoint(None, Trigger::Manual, text("lost"), CONTEXT)
        .await;

    assert!(matches!(
        result,
        Err(PersistenceError::PersistenceFailure { .. })
    ));
    assert!(backend.keys().is_empty());
}

#[tokio::test]
async fn retention_keeps_manual_and_current() {
    let backend = Arc::new(MemoryBackend::new());
    let store = CheckpointStore::with_options(
        backend.clone(),
        Namespace::default(),
        RetentionPolicy::keep_automatic(2),
    );

    let draft = store
        .checkpoint(None, Trigger::Manual, text("m0"), CONTEXT)
        .await
        .unwrap();
    for i in 1..=5 {
        store
            .checkpoint(Some(draft), Trigger::Automatic, text(&format!("a{i}")), CONTEXT)
            .await
            .unwrap();
    }

    let history = store.history(draft, CONTEXT).await.unwrap();
    let triggers: Vec<Trigger> = history.iter().map(|entry| entry.trigger).collect();
    assert_eq!(
        triggers,
        vec![Trigger::Manual, Trigger::Automatic, Trigger::Automatic]
    );

    let current = store.current(draft, CONTEXT).await.unwrap();
    assert_eq!(current.snapshot.as_text(), Some("a5"));

    // Manifest plus one payload per surviving entry.
    assert_eq!(backend.keys().len(), 1 + history.len());
}

#[tokio::test]
async fn tampered_snapshot_is_reported_as_corrupted() {
    let (backend, store) = memory_store();
    let draft = store
        .checkpoint(None, Trigger::Manual, text("original"), CONTEXT)
        .await
        .unwrap();
    let mut checkpoint = store.current(draft, CONTEXT).await.unwrap();

    checkpoint.snapshot = text("tampered");
    let key = StorageKey::from_segments([
        "local".to_string(),
        CONTEXT.to_string(),
        draft.to_string(),
        "checkpoints".to_string(),
        format!("{}.json", checkpoint.id),
    ])
    .unwrap();
    backend.put_raw(key, serde_json::to_vec(&checkpoint).unwrap());

    assert!(matches!(
        store.load(draft, CONTEXT, checkpoint.id).await,
        Err(PersistenceError::CorruptedCheckpoint { .. })
    ));
}

#[tokio::test]
async fn newer_manifest_version_is_rejected() {
    let (backend, store) = memory_store();
    let draft = store
        .checkpoint(None, Trigger::Manual, text("x"), CONTEXT)
        .await
        .unwrap();

    let key = StorageKey::from_segments([
        "local".to_string(),
        CONTEXT.to_string(),
        draft.to_string(),
        "manifest.json".to_string(),
    ])
    .unwrap();
    backend.put_raw(key, br#"{"schema_version": 99}"#.to_vec());

    let error = store.current(draft, CONTEXT).await.unwrap_err();
    assert!(matches!(
        error,
        PersistenceError::UnsupportedVersion { found: 99, .. }
    ));
    assert!(error.suggestion().is_some());
}

#[tokio::test]
async fn unknown_checkpoint_is_not_found() {
    let (_, store) = memory_store();
    let draft = store
        .checkpoint(None, Trigger::Manual, text("x"), CONTEXT)
        .await
        .unwrap();

    assert!(matches!(
        store
            .load(draft, CONTEXT, desk_persistence::CheckpointId::new())
            .await,
        Err(PersistenceError::CheckpointNotFound { .. })
    ));
}

fn trigger_strategy() -> impl Strategy<Value = Trigger> {
    prop_oneof![Just(Trigger::Manual), Just(Trigger::Automatic)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn created_at_strictly_increases_and_current_is_last(
        triggers in prop::collection::vec(trigger_strategy(), 1..20),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let (_, store) = memory_store();
            let mut draft = None;
            for (i, trigger) in triggers.iter().enumerate() {
                let id = store
                    .checkpoint(draft, *trigger, text(&i.to_string()), CONTEXT)
                    .await
                    .unwrap();
                draft = Some(id);
            }
            let draft = draft.unwrap();

            let history = store.history(draft, CONTEXT).await.unwrap();
            prop_assert_eq!(history.len(), triggers.len());
            for pair in history.windows(2) {
                prop_assert!(pair[0].created_at < pair[1].created_at);
            }

            let current = store.current(draft, CONTEXT).await.unwrap();
            let last = history.last().unwrap();
            prop_assert_eq!(current.id, last.id);
            let expected = (triggers.len() - 1).to_string();
            prop_assert_eq!(current.snapshot.as_text(), Some(expected.as_str()));
            Ok(())
        })?;
    }
}
