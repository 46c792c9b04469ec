//! Checkpoint store over the file backend.

use std::sync::Arc;

use desk_persistence::{CheckpointStore, FileBackend, Snapshot, Trigger};
use tempfile::tempdir;

#[tokio::test]
async fn checkpoints_survive_a_new_store() {
    let dir = tempdir().unwrap();

    let draft = {
        let store = CheckpointStore::new(Arc::new(FileBackend::new(dir.path())));
        let draft = store
            .checkpoint(None, Trigger::Manual, Snapshot::from_text("first"), "composer")
            .await
            .unwrap();
        store
            .checkpoint(Some(draft), Trigger::Automatic, Snapshot::from_text("second"), "composer")
            .await
            .unwrap();
        draft
    };

    let reopened = CheckpointStore::new(Arc::new(FileBackend::new(dir.path())));
    let current = reopened.current(draft, "composer").await.unwrap();
    assert_eq!(current.snapshot.as_text(), Some("second"));
    assert_eq!(reopened.history(draft, "composer").await.unwrap().len(), 2);
}

#[tokio::test]
async fn files_follow_the_storage_layout() {
    let dir = tempdir().unwrap();
    let store = CheckpointStore::new(Arc::new(FileBackend::new(dir.path())));

    let draft = store
        .checkpoint(None, Trigger::Manual, Snapshot::from_text("gm"), "composer")
        .await
        .unwrap();
    let current = store.current(draft, "composer").await.unwrap();

    let draft_dir = dir.path().join("local").join("composer").join(draft.to_string());
    assert!(draft_dir.join("manifest.json").is_file());
    assert!(
        draft_dir
            .join("checkpoints")
            .join(format!("{}.json", current.id))
            .is_file()
    );
}

#[tokio::test]
async fn discard_deletes_files() {
    let dir = tempdir().unwrap();
    let store = CheckpointStore::new(Arc::new(FileBackend::new(dir.path())));

    let draft = store
        .checkpoint(None, Trigger::Manual, Snapshot::from_text("bye"), "composer")
        .await
        .unwrap();
    assert_eq!(store.discard(draft, "composer").await.unwrap(), 1);

    let draft_dir = dir.path().join("local").join("composer").join(draft.to_string());
    assert!(!draft_dir.join("manifest.json").exists());
}
