//! Draft checkpoint storage for Draftdesk editors.
//!
//! Editors hand the store opaque snapshots of their state; the store keeps an
//! append-only, per-draft history of those snapshots and returns a stable
//! draft id.
//!
//! # Features
//!
//! - **Per-draft write queues** so checkpoints land in call order
//! - **Atomic writes** in the file backend to prevent torn records
//! - **Corruption detection** via SHA-256 digests of every snapshot
//! - **Retention** of automatic checkpoints, manual ones are always kept
//! - **Autosave** configuration and dirty tracking with max-delay forcing
//!
//! # Storage Layout
//!
//! ```text
//! <namespace>/<context>/<draft-id>/manifest.json
//! <namespace>/<context>/<draft-id>/checkpoints/<checkpoint-id>.json
//! ```
//!
//! The manifest lists checkpoint entries in creation order and carries a
//! `schema_version`. Checkpoint records embed the hex-encoded snapshot and its
//! digest.
//!
//! # Example
//!
//! ```ignore
//! use desk_persistence::{CheckpointStore, FileBackend, Snapshot, Trigger};
//!
//! let store = CheckpointStore::new(Arc::new(FileBackend::new("/var/lib/draftdesk")));
//! let draft = store
//!     .checkpoint(None, Trigger::Manual, Snapshot::from_text("gm"), "composer")
//!     .await?;
//! let history = store.history(draft, "composer").await?;
//! ```
//!
//! # Architecture
//!
//! - `types/` - Ids, snapshots, checkpoint records and manifests
//! - `backend/` - Storage trait with memory and file implementations
//! - `store/` - Async checkpoint store, write queues and retention
//! - `autosave/` - Autosave config and dirty tracking
//! - `error.rs` - Error types with user-friendly messages

mod autosave;
mod backend;
mod digest;
mod error;
mod store;
mod types;

pub use autosave::{AutoSaveConfig, DirtyTracker};
pub use backend::{FileBackend, MemoryBackend, StorageBackend, StorageKey, is_valid_segment};
pub use digest::{compute_digest, verify_digest};
pub use error::{PersistenceError, Result, StorageError};
pub use store::{CheckpointStore, PendingCheckpoint, RetentionPolicy};
pub use types::{
    CURRENT_SCHEMA_VERSION, Checkpoint, CheckpointEntry, CheckpointId, DraftId, DraftManifest,
    Namespace, Snapshot, Trigger,
};
