//! Autosave support for editors backed by the checkpoint store.
//!
//! Provides:
//! - `DirtyTracker` - Tracks unsaved changes and the outcome of the last save
//! - `AutoSaveConfig` - User settings for autosave timing

mod config;
mod tracker;

pub use config::AutoSaveConfig;
pub use tracker::DirtyTracker;
