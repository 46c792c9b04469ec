//! Shared utilities for Draftdesk crates.
//!
//! Currently hosts the [`DebouncedCell`] scheduling primitive used to
//! throttle autosave of in-progress drafts.

pub mod debounce;

pub use debounce::DebouncedCell;
