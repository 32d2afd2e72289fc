//! Settings error-message, atomic-write-safety, and init integration tests.

use assert_fs::prelude::*;
use launchpad_core::{settings, CoreError, Settings};
use predicates::prelude::*;
use std::fs;

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_missing_settings_returns_not_found() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let err = settings::load_at(home.path()).unwrap_err();
    assert!(matches!(err, CoreError::SettingsNotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("launchpad config init"));
    assert!(err.to_string().contains("config.yaml"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let dir = home.path().join(".launchpad");
    fs::create_dir_all(&dir).expect("mkdir");
    fs::write(dir.join("config.yaml"), b": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = settings::load_at(home.path()).unwrap_err();
    assert!(matches!(err, CoreError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("config.yaml"), "must contain file path, got: {err}");
}

#[test]
fn load_missing_required_field_returns_parse_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".launchpad/config.yaml")
        .write_str("version: 1\napi_url: https://api.example.test\n")
        .expect("write");

    let err = settings::load_at(home.path()).unwrap_err();
    assert!(matches!(err, CoreError::Parse { .. }), "got: {err}");
}

#[test]
fn optional_fields_take_defaults() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".launchpad/config.yaml")
        .write_str("version: 1\napi_url: https://api.example.test\nlive_url: wss://live.example.test\n")
        .expect("write");

    let loaded = settings::load_at(home.path()).expect("load");
    assert_eq!(loaded.request_timeout_secs, 30);
    assert_eq!(loaded.default_web_root, "public_html");
    assert!(loaded.token.is_none());
}

// ---------------------------------------------------------------------------
// 2. Atomic write safety
// ---------------------------------------------------------------------------

#[test]
fn save_cleans_up_tmp_file() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let s = Settings::new("https://api.example.test", "wss://live.example.test");
    settings::save_at(home.path(), &s).expect("save");

    home.child(".launchpad/config.yaml.tmp").assert(predicate::path::missing());
    home.child(".launchpad/config.yaml").assert(predicate::path::exists());
}

#[test]
fn stale_tmp_does_not_shadow_saved_settings() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let s = Settings::new("https://api.example.test", "wss://live.example.test");
    settings::save_at(home.path(), &s).expect("save");

    // Simulate a crash mid-write: garbage left in the tmp sibling.
    home.child(".launchpad/config.yaml.tmp")
        .write_str("garbage: [")
        .expect("write tmp");

    let loaded = settings::load_at(home.path()).expect("original still loads");
    assert_eq!(loaded.api_url, "https://api.example.test");
}

// ---------------------------------------------------------------------------
// 3. Init
// ---------------------------------------------------------------------------

#[test]
fn init_trims_trailing_slash_and_drops_blank_token() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let s = settings::init_at(
        home.path(),
        "https://api.example.test/",
        "wss://live.example.test",
        Some("   ".to_string()),
    )
    .expect("init");
    assert_eq!(s.api_url, "https://api.example.test");
    assert!(s.token.is_none());

    home.child(".launchpad/config.yaml")
        .assert(predicate::str::contains("api_url: https://api.example.test"));
    home.child(".launchpad/config.yaml")
        .assert(predicate::str::contains("token").not());
}

#[test]
fn init_overwrites_existing_settings() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    settings::init_at(home.path(), "https://old", "wss://old", Some("a".into())).expect("init");
    settings::init_at(home.path(), "https://new", "wss://new", Some("b".into())).expect("re-init");

    let loaded = settings::load_at(home.path()).expect("load");
    assert_eq!(loaded.api_url, "https://new");
    assert_eq!(loaded.token.as_deref(), Some("b"));
}
