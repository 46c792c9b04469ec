//! Settings file handling.

use std::fs;
use std::path::PathBuf;

use desk_cli::settings::{Settings, SettingsError};
use desk_persistence::RetentionPolicy;
use tempfile::tempdir;

#[test]
fn missing_file_uses_defaults() {
    let dir = tempdir().unwrap();
    let settings = Settings::load_from(&dir.path().join("settings.toml")).unwrap();

    assert_eq!(settings, Settings::default());
    assert!(settings.autosave.enabled);
    assert_eq!(settings.autosave.debounce_ms, 2000);
    assert_eq!(settings.retention.policy(), RetentionPolicy::default());
}

#[test]
fn partial_file_keeps_other_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.toml");
    fs::write(
        &path,
        r#"
[autosave]
debounce_ms = 500

[storage]
root = "/tmp/drafts"

[identity]
actor = "npub1alice"
"#,
    )
    .unwrap();

    let settings = Settings::load_from(&path).unwrap();

    assert_eq!(settings.autosave.debounce_ms, 500);
    assert_eq!(settings.autosave.max_delay_ms, 30_000);
    assert_eq!(settings.storage_root(), PathBuf::from("/tmp/drafts"));
    assert_eq!(settings.namespace().unwrap().as_str(), "npub1alice");
    assert_eq!(settings.retention.max_automatic, 50);
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.toml");
    fs::write(&path, "[autosave]\ndebounce_ms = \"soon\"\n").unwrap();

    let error = Settings::load_from(&path).unwrap_err();
    assert!(matches!(error, SettingsError::Parse { .. }));
}

#[test]
fn saved_settings_load_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("settings.toml");

    let mut settings = Settings::default();
    settings.retention.max_automatic = 0;
    settings.autosave.enabled = false;
    settings.identity.actor = Some("npub1bob".into());
    settings.save_to(&path).unwrap();

    let loaded = Settings::load_from(&path).unwrap();
    assert_eq!(loaded, settings);
    assert_eq!(loaded.retention.policy(), RetentionPolicy::unbounded());
}
