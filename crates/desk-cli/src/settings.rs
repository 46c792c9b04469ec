//! User settings, loaded from TOML.
//!
//! ```toml
//! [autosave]
//! enabled = true
//! debounce_ms = 2000
//! max_delay_ms = 30000
//!
//! [retention]
//! max_automatic = 50   # 0 keeps every automatic checkpoint
//!
//! [storage]
//! root = "/home/me/.local/share/draftdesk/drafts"
//!
//! [identity]
//! actor = "npub1alice"
//! ```
//!
//! A missing file yields the defaults; a malformed one is an error.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use desk_persistence::{AutoSaveConfig, Namespace, PersistenceError, RetentionPolicy};

/// Errors raised while loading or saving settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings from {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings in {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize settings")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write settings to {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid identity actor")]
    InvalidActor(#[source] PersistenceError),
}

/// Application settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub autosave: AutoSaveConfig,
    pub retention: RetentionSettings,
    pub storage: StorageSettings,
    pub identity: IdentitySettings,
}

/// Retention of automatic checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionSettings {
    /// Automatic checkpoints kept per draft; 0 keeps all of them.
    pub max_automatic: usize,
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            max_automatic: RetentionPolicy::default().max_automatic.unwrap_or(0),
        }
    }
}

impl RetentionSettings {
    pub fn policy(&self) -> RetentionPolicy {
        match self.max_automatic {
            0 => RetentionPolicy::unbounded(),
            max => RetentionPolicy::keep_automatic(max),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory holding draft checkpoints. Defaults to the platform data dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    /// Actor tag drafts are stored under. Defaults to `local`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

impl Settings {
    /// Load settings from the default path, if there is one.
    pub fn load() -> Result<Self, SettingsError> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load settings from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Get the default config file path.
    pub fn config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("settings.toml"))
    }

    /// Directory holding draft checkpoints.
    pub fn storage_root(&self) -> PathBuf {
        self.storage
            .root
            .clone()
            .or_else(|| project_dirs().map(|dirs| dirs.data_dir().join("drafts")))
            .unwrap_or_else(|| PathBuf::from(".draftdesk"))
    }

    /// Storage namespace of the configured actor.
    pub fn namespace(&self) -> Result<Namespace, SettingsError> {
        match &self.identity.actor {
            Some(actor) => Namespace::new(actor.as_str()).map_err(SettingsError::InvalidActor),
            None => Ok(Namespace::default()),
        }
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("org", "Draftdesk", "draftdesk")
}
