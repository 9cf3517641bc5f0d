use super::*;
use chrono::TimeZone;

fn run_at(company: &str, key: &str, obligations: &[&str], secs: i64) -> ExtractionRun {
    ExtractionRun {
        company: company.to_string(),
        pdf_key: PdfKey::from(key),
        obligations: obligations.iter().map(|o| Obligation::from(*o)).collect(),
        created_at: Utc.timestamp_opt(secs, 0).single().expect("timestamp"),
    }
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn preferences_behave_like_local_storage() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    assert_eq!(storage.get_item(PDF_KEY_PREF).await.expect("get"), None);

    storage
        .set_item(PDF_KEY_PREF, "raw/1_act.pdf")
        .await
        .expect("set");
    storage
        .set_item(PDF_KEY_PREF, "raw/2_act.pdf")
        .await
        .expect("overwrite");
    storage
        .set_item(LAST_COMPANY_PREF, "ACME Pty Ltd")
        .await
        .expect("set company");

    assert_eq!(
        storage.get_item(PDF_KEY_PREF).await.expect("get").as_deref(),
        Some("raw/2_act.pdf")
    );
    assert_eq!(
        storage.items().await.expect("items"),
        vec![
            (LAST_COMPANY_PREF.to_string(), "ACME Pty Ltd".to_string()),
            (PDF_KEY_PREF.to_string(), "raw/2_act.pdf".to_string()),
        ]
    );

    storage.remove_item(PDF_KEY_PREF).await.expect("remove");
    storage
        .remove_item(PDF_KEY_PREF)
        .await
        .expect("removing a missing key is not an error");
    assert_eq!(storage.get_item(PDF_KEY_PREF).await.expect("get"), None);
}

#[tokio::test]
async fn runs_are_listed_newest_first() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .record_run(&run_at("ACME", "raw/a.pdf", &["Keep records"], 100))
        .await
        .expect("first");
    storage
        .record_run(&run_at("Globex", "raw/b.pdf", &[], 200))
        .await
        .expect("second");

    let runs = storage.list_runs(10).await.expect("list");
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].company, "Globex");
    assert!(runs[0].obligations.is_empty());
    assert_eq!(runs[1].obligations, vec![Obligation::from("Keep records")]);

    let latest = storage.latest_run().await.expect("latest").expect("some");
    assert_eq!(latest.pdf_key, PdfKey::from("raw/b.pdf"));

    assert_eq!(storage.clear_runs().await.expect("clear"), 2);
    assert!(storage.latest_run().await.expect("latest").is_none());
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("aggregator.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    storage
        .set_item(LAST_COMPANY_PREF, "ACME")
        .await
        .expect("set");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    let reopened = Storage::new(&database_url).await.expect("reopen");
    assert_eq!(
        reopened
            .get_item(LAST_COMPANY_PREF)
            .await
            .expect("get")
            .as_deref(),
        Some("ACME")
    );
}

#[tokio::test]
async fn memory_store_mirrors_sqlite_semantics() {
    let store = MemoryStore::with_items([(PDF_KEY_PREF, "raw/x.pdf")]);
    assert_eq!(
        store.get_item(PDF_KEY_PREF).await.expect("get").as_deref(),
        Some("raw/x.pdf")
    );
    store.remove_item(PDF_KEY_PREF).await.expect("remove");
    assert!(store.items().await.expect("items").is_empty());

    store
        .record_run(&run_at("ACME", "raw/a.pdf", &[], 1))
        .await
        .expect("first");
    store
        .record_run(&run_at("Globex", "raw/b.pdf", &[], 2))
        .await
        .expect("second");
    assert_eq!(store.list_runs(1).await.expect("list")[0].company, "Globex");
}

#[test]
fn sqlite_path_ignores_memory_and_query_suffix() {
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(
        sqlite_path("sqlite://./data/aggregator.db?mode=rwc"),
        Some(PathBuf::from("./data/aggregator.db"))
    );
}

#[test]
fn memory_pool_keeps_its_only_connection_alive() {
    let memory = pool_options("sqlite::memory:");
    assert_eq!(memory.get_max_connections(), 1);
    assert_eq!(memory.get_idle_timeout(), None);
    assert_eq!(memory.get_max_lifetime(), None);

    let file = pool_options("sqlite://./data/aggregator.db");
    assert_eq!(file.get_max_connections(), 5);
    assert!(file.get_idle_timeout().is_some());
}
