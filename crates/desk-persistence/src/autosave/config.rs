//! Autosave configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for autosave behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSaveConfig {
    /// Whether autosave is enabled.
    pub enabled: bool,

    /// Debounce delay in milliseconds.
    ///
    /// After an edit, the editor waits this long before checkpointing.
    /// Further edits restart the window.
    pub debounce_ms: u64,

    /// Maximum delay before forcing a checkpoint.
    ///
    /// If edits keep coming, checkpoint after this many milliseconds
    /// since the first unsaved edit.
    pub max_delay_ms: u64,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 2000,
            max_delay_ms: 30_000,
        }
    }
}

impl AutoSaveConfig {
    /// Create a disabled autosave config.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// True once unsaved edits are older than `max_delay_ms`, regardless of
    /// how recent the last edit is.
    pub fn should_force(&self, since_first_unsaved_ms: u64) -> bool {
        self.enabled && since_first_unsaved_ms >= self.max_delay_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AutoSaveConfig::default();
        assert!(config.enabled);
        assert_eq!(config.debounce(), Duration::from_secs(2));
        assert_eq!(config.max_delay_ms, 30_000);
    }

    #[test]
    fn test_disabled_never_forces() {
        assert!(!AutoSaveConfig::disabled().should_force(60_000));
    }

    #[test]
    fn test_should_force_at_max_delay() {
        let config = AutoSaveConfig::default();
        assert!(!config.should_force(29_999));
        assert!(config.should_force(30_000));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AutoSaveConfig = serde_json::from_str(r#"{"debounce_ms": 300}"#).unwrap();
        assert_eq!(config.debounce_ms, 300);
        assert_eq!(config.max_delay_ms, 30_000);
        assert!(config.enabled);
    }
}
