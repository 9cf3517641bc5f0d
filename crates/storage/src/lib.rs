use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tokio::sync::RwLock;

use shared::domain::{ExtractionRun, Obligation, PdfKey};

/// Preference holding the currently selected PDF key.
pub const PDF_KEY_PREF: &str = "pdfKey";
/// Preference holding the last company name a model run or discovery used.
pub const LAST_COMPANY_PREF: &str = "lastCompany";
/// Preference holding the last country submitted to discovery.
pub const LAST_COUNTRY_PREF: &str = "lastCountry";

/// String key/value persistence with `localStorage` semantics.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>>;
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;
    async fn remove_item(&self, key: &str) -> Result<()>;
    async fn items(&self) -> Result<Vec<(String, String)>>;
}

/// Local log of completed model runs.
#[async_trait]
pub trait RunHistory: Send + Sync {
    async fn record_run(&self, run: &ExtractionRun) -> Result<()>;
    /// Most recent runs first.
    async fn list_runs(&self, limit: u32) -> Result<Vec<ExtractionRun>>;
    async fn clear_runs(&self) -> Result<u64>;

    async fn latest_run(&self) -> Result<Option<ExtractionRun>> {
        Ok(self.list_runs(1).await?.into_iter().next())
    }
}

pub trait LocalStore: PreferenceStore + RunHistory {}

impl<T: PreferenceStore + RunHistory> LocalStore for T {}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid sqlite url '{database_url}'"))?
            .create_if_missing(true);
        let pool = pool_options(database_url)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open sqlite database '{database_url}'"))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run storage migrations")?;
        tracing::debug!(database_url, "storage ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for Storage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM preferences WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to read preference '{key}'"))?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO preferences (key, value, updated_at)
            VALUES (?1, ?2, CURRENT_TIMESTAMP)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to write preference '{key}'"))?;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM preferences WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to remove preference '{key}'"))?;
        Ok(())
    }

    async fn items(&self) -> Result<Vec<(String, String)>> {
        let rows = sqlx::query("SELECT key, value FROM preferences ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .context("failed to list preferences")?;
        Ok(rows
            .into_iter()
            .map(|row| (row.get::<String, _>(0), row.get::<String, _>(1)))
            .collect())
    }
}

#[async_trait]
impl RunHistory for Storage {
    async fn record_run(&self, run: &ExtractionRun) -> Result<()> {
        let obligations_json = serde_json::to_string(&run.obligations)?;
        sqlx::query(
            "INSERT INTO extraction_runs (company, pdf_key, obligations_json, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&run.company)
        .bind(run.pdf_key.as_str())
        .bind(obligations_json)
        .bind(run.created_at)
        .execute(&self.pool)
        .await
        .context("failed to record extraction run")?;
        Ok(())
    }

    async fn list_runs(&self, limit: u32) -> Result<Vec<ExtractionRun>> {
        let rows = sqlx::query(
            r#"
            SELECT company, pdf_key, obligations_json, created_at
            FROM extraction_runs
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .context("failed to list extraction runs")?;

        rows.into_iter()
            .map(|row| {
                let obligations_json: String = row.get("obligations_json");
                let obligations: Vec<Obligation> = serde_json::from_str(&obligations_json)
                    .context("stored obligations are not valid json")?;
                Ok(ExtractionRun {
                    company: row.get("company"),
                    pdf_key: PdfKey(row.get("pdf_key")),
                    obligations,
                    created_at: row.get::<DateTime<Utc>, _>("created_at"),
                })
            })
            .collect()
    }

    async fn clear_runs(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM extraction_runs")
            .execute(&self.pool)
            .await
            .context("failed to clear extraction runs")?;
        Ok(result.rows_affected())
    }
}

/// Process-local store used by tests.
#[derive(Default)]
pub struct MemoryStore {
    preferences: RwLock<BTreeMap<String, String>>,
    runs: RwLock<Vec<ExtractionRun>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items<'a>(items: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let preferences = items
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            preferences: RwLock::new(preferences),
            runs: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.preferences.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.preferences
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.preferences.write().await.remove(key);
        Ok(())
    }

    async fn items(&self) -> Result<Vec<(String, String)>> {
        Ok(self
            .preferences
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[async_trait]
impl RunHistory for MemoryStore {
    async fn record_run(&self, run: &ExtractionRun) -> Result<()> {
        self.runs.write().await.push(run.clone());
        Ok(())
    }

    async fn list_runs(&self, limit: u32) -> Result<Vec<ExtractionRun>> {
        let runs = self.runs.read().await;
        Ok(runs.iter().rev().take(limit as usize).cloned().collect())
    }

    async fn clear_runs(&self) -> Result<u64> {
        let mut runs = self.runs.write().await;
        let removed = runs.len() as u64;
        runs.clear();
        Ok(removed)
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

/// An in-memory database lives and dies with its connection, so it gets a
/// single connection that is never recycled.
fn pool_options(database_url: &str) -> SqlitePoolOptions {
    if database_url.starts_with("sqlite::memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    }
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
