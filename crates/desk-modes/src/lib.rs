//! Interaction modes for Draftdesk clients.
//!
//! A client's interaction region shows one panel at a time (comment, curate,
//! explore, create-item, zap, zap-prompt). This crate provides:
//!
//! - [`ModeRegistry`] - ordered mode descriptors, the active mode and lazily
//!   created per-mode state
//! - [`StateContainer`] - type-erased reactive state owned by one mode
//! - [`default_registry`] - the built-in catalog
//! - [`ComposerSession`] - debounced autosave of the comment composer into
//!   the checkpoint store

pub mod catalog;
mod composer;
mod registry;
mod state;

pub use catalog::{
    ComposerDraft, CreateItemState, CurationState, ExploreState, ZapPromptState, ZapState,
    default_registry,
};
pub use composer::{AutosaveStatus, COMPOSER_CONTEXT, ComposerError, ComposerSession};
pub use registry::{ActiveMode, Affordance, ModeDescriptor, ModeError, ModeRegistry, StateFactory};
pub use state::StateContainer;
