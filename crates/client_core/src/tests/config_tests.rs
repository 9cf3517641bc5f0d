use super::*;

use std::{env, fs};

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
    assert_eq!(
        normalize_database_url("sqlite:data/test.db"),
        "sqlite://data/test.db"
    );
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
}

#[test]
fn blank_database_url_falls_back_to_default() {
    assert_eq!(normalize_database_url("   "), default_database_url());
}

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = load_settings_from(&dir.path().join("absent.toml")).expect("settings");
    assert_eq!(settings.api_base_url, DEFAULT_API_BASE_URL);
    assert_eq!(settings.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    assert_eq!(settings.database_url, default_database_url());
}

#[test]
fn file_values_override_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("aggregator.toml");
    fs::write(
        &path,
        r#"
api_base_url = "http://backend.internal:9000/api"
database_url = "./state/prefs.db"
request_timeout_secs = 45
"#,
    )
    .expect("write config");

    let settings = load_settings_from(&path).expect("settings");
    assert_eq!(settings.api_base_url, "http://backend.internal:9000/api");
    assert_eq!(settings.database_url, "sqlite://./state/prefs.db");
    assert_eq!(settings.request_timeout_secs, 45);
}

#[test]
fn environment_overrides_log_filter() {
    env::set_var("AGGREGATOR__LOG_FILTER", "client_core=debug");
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = load_settings_from(&dir.path().join("absent.toml")).expect("settings");
    env::remove_var("AGGREGATOR__LOG_FILTER");
    assert_eq!(settings.log_filter, "client_core=debug");
}
