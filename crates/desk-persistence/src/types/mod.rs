//! Persistence types for draft checkpoints.
//!
//! Records are stored as JSON. Snapshot payloads are opaque bytes and are
//! hex-encoded inside the checkpoint record.

mod checkpoint;
mod ids;
mod manifest;
mod snapshot;

pub use checkpoint::{Checkpoint, CheckpointEntry, Trigger};
pub use ids::{CheckpointId, DraftId, Namespace};
pub use manifest::DraftManifest;
pub use snapshot::Snapshot;

/// Current manifest schema version.
///
/// Increment this when making breaking changes to the manifest format.
/// The store rejects manifests with version > CURRENT_SCHEMA_VERSION.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;
