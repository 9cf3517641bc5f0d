use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "aggregator.toml";
pub const ENV_PREFIX: &str = "AGGREGATOR";
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api";
/// Model runs on long legislation regularly take minutes.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub api_base_url: String,
    pub database_url: String,
    pub request_timeout_secs: u64,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            database_url: default_database_url(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            log_filter: DEFAULT_LOG_FILTER.into(),
        }
    }
}

/// Loads settings from `aggregator.toml` in the working directory, then
/// `AGGREGATOR__*` environment variables.
pub fn load_settings() -> Result<Settings, ConfigError> {
    load_settings_from(Path::new(CONFIG_FILE_NAME))
}

pub fn load_settings_from(path: &Path) -> Result<Settings, ConfigError> {
    let defaults = Settings::default();
    let mut settings: Settings = Config::builder()
        .set_default("api_base_url", defaults.api_base_url)?
        .set_default("database_url", defaults.database_url)?
        .set_default(
            "request_timeout_secs",
            i64::try_from(defaults.request_timeout_secs).unwrap_or(i64::MAX),
        )?
        .set_default("log_filter", defaults.log_filter)?
        .add_source(File::from(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    settings.database_url = normalize_database_url(&settings.database_url);
    Ok(settings)
}

/// Per-user database location, falling back to `./data` when the platform has
/// no data directory.
pub fn default_database_url() -> String {
    let path = dirs::data_local_dir()
        .map(|dir| dir.join("aggregator").join("aggregator.db"))
        .unwrap_or_else(|| PathBuf::from("./data/aggregator.db"));
    format!("sqlite://{}", path.to_string_lossy().replace('\\', "/"))
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return default_database_url();
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
