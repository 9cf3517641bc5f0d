use std::sync::Arc;

use chrono::Utc;
use shared::domain::{ExtractionRun, Obligation, PdfKey};
use storage::{
    LocalStore, PreferenceStore, RunHistory, Storage, LAST_COMPANY_PREF, PDF_KEY_PREF,
};

async fn remember_run(store: Arc<dyn LocalStore>, company: &str, key: &str) {
    store.set_item(PDF_KEY_PREF, key).await.expect("select");
    store
        .set_item(LAST_COMPANY_PREF, company)
        .await
        .expect("company");
    store
        .record_run(&ExtractionRun {
            company: company.to_string(),
            pdf_key: PdfKey::from(key),
            obligations: vec![Obligation::from("Lodge an annual return")],
            created_at: Utc::now(),
        })
        .await
        .expect("record");
}

#[tokio::test]
async fn selection_company_and_results_survive_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!(
        "sqlite://{}",
        dir.path()
            .join("aggregator.db")
            .to_string_lossy()
            .replace('\\', "/")
    );

    let storage = Storage::new(&url).await.expect("open");
    remember_run(Arc::new(storage.clone()), "ACME Pty Ltd", "raw/9_act.pdf").await;
    storage.pool().close().await;

    let reopened = Storage::new(&url).await.expect("reopen");
    assert_eq!(
        reopened.get_item(PDF_KEY_PREF).await.expect("get").as_deref(),
        Some("raw/9_act.pdf")
    );
    let latest = reopened.latest_run().await.expect("latest").expect("run");
    assert_eq!(latest.company, "ACME Pty Ltd");
    assert_eq!(
        latest.obligations,
        vec![Obligation::from("Lodge an annual return")]
    );
}
