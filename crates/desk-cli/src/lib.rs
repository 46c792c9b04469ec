//! Library components of the `draftdesk` binary.

pub mod logging;
pub mod settings;
