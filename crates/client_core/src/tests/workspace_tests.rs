use std::time::Duration;

use storage::{MemoryStore, PreferenceStore, RunHistory};
use tokio::sync::broadcast::error::TryRecvError;

use super::*;
use crate::{mock_backend::MockBackend, HttpComplianceClient};

struct Harness {
    backend: MockBackend,
    store: Arc<MemoryStore>,
    workspace: UploadWorkspace,
    events: broadcast::Receiver<WorkspaceEvent>,
}

async fn harness_with(backend: MockBackend, store: MemoryStore) -> Harness {
    let base_url = backend.spawn().await;
    let api = Arc::new(
        HttpComplianceClient::new(&base_url, Duration::from_secs(5)).expect("client"),
    );
    let store = Arc::new(store);
    let workspace = UploadWorkspace::open(api, store.clone()).await;
    let events = workspace.subscribe_events();
    Harness {
        backend,
        store,
        workspace,
        events,
    }
}

fn drain_alerts(events: &mut broadcast::Receiver<WorkspaceEvent>) -> Vec<String> {
    let mut alerts = Vec::new();
    loop {
        match events.try_recv() {
            Ok(WorkspaceEvent::Alert(message)) => alerts.push(message),
            Ok(WorkspaceEvent::StateChanged(_)) => {}
            Err(TryRecvError::Lagged(_)) => {}
            Err(_) => break,
        }
    }
    alerts
}

fn write_pdf(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"%PDF-1.7 test").expect("write pdf");
    path
}

#[tokio::test]
async fn open_restores_selection_and_company_from_preferences() {
    let backend = MockBackend::with_keys(&["raw/1_act.pdf"]).await;
    backend
        .persist_output("raw/1_act.pdf", &["Lodge annual returns"])
        .await;
    let store = MemoryStore::with_items([
        (PDF_KEY_PREF, "raw/1_act.pdf"),
        (LAST_COMPANY_PREF, "ACME Pty Ltd"),
    ]);
    let mut h = harness_with(backend, store).await;

    assert_eq!(h.workspace.snapshot().company_input, "ACME Pty Ltd");
    assert_eq!(
        h.workspace.snapshot().selected_key,
        Some(PdfKey::from("raw/1_act.pdf"))
    );
    assert!(h.workspace.snapshot().all_keys.is_empty());

    h.workspace.load().await;
    let snapshot = h.workspace.snapshot();
    assert_eq!(snapshot.all_keys, vec![PdfKey::from("raw/1_act.pdf")]);
    assert_eq!(
        snapshot.pdf_url.as_deref(),
        Some("https://bucket.example/raw/1_act.pdf?X-Amz-Signature=abc")
    );
    assert_eq!(
        snapshot.obligations,
        vec![Obligation::from("Lodge annual returns")]
    );
}

#[tokio::test]
async fn open_restores_country_and_latest_run() {
    let store = MemoryStore::with_items([(LAST_COUNTRY_PREF, "Australia")]);
    let run = ExtractionRun {
        company: "ACME".to_string(),
        pdf_key: PdfKey::from("raw/1_act.pdf"),
        obligations: vec![Obligation::from("Lodge annual returns")],
        created_at: Utc::now(),
    };
    store.record_run(&run).await.expect("record");

    let h = harness_with(MockBackend::default(), store).await;
    let snapshot = h.workspace.snapshot();
    assert_eq!(snapshot.last_country, "Australia");
    assert_eq!(snapshot.last_run, Some(run));
    assert_eq!(snapshot.selected_key, None);
}

#[tokio::test]
async fn list_failure_is_logged_without_alert() {
    let backend = MockBackend::with_keys(&["raw/1_act.pdf"]).await;
    backend.fail("list-pdfs").await;
    let mut h = harness_with(backend, MemoryStore::new()).await;

    h.workspace.load().await;
    assert!(h.workspace.snapshot().all_keys.is_empty());
    assert!(drain_alerts(&mut h.events).is_empty());
}

#[tokio::test]
async fn selecting_persists_key_and_degrades_when_preview_fails() {
    let backend = MockBackend::with_keys(&["raw/1_act.pdf"]).await;
    backend.fail("pdf-url").await;
    backend.fail("output").await;
    let mut h = harness_with(backend, MemoryStore::new()).await;

    h.workspace.select(Some(PdfKey::from("raw/1_act.pdf"))).await;
    assert_eq!(
        h.store.get_item(PDF_KEY_PREF).await.expect("get").as_deref(),
        Some("raw/1_act.pdf")
    );
    assert_eq!(h.workspace.snapshot().pdf_url, None);
    assert!(h.workspace.snapshot().obligations.is_empty());
    assert!(drain_alerts(&mut h.events).is_empty());

    h.workspace.select(None).await;
    assert_eq!(h.store.get_item(PDF_KEY_PREF).await.expect("get"), None);
    assert_eq!(h.workspace.snapshot().selected_key, None);
}

#[tokio::test]
async fn upload_without_file_alerts_and_skips_network() {
    let mut h = harness_with(MockBackend::default(), MemoryStore::new()).await;

    assert_eq!(h.workspace.upload().await, None);
    assert_eq!(drain_alerts(&mut h.events), vec![ALERT_NO_FILE.to_string()]);
    assert!(h.backend.state.lock().await.uploads.is_empty());
}

#[tokio::test]
async fn choosing_a_non_pdf_is_refused() {
    let mut h = harness_with(MockBackend::default(), MemoryStore::new()).await;
    assert!(!h.workspace.choose_file(PathBuf::from("/tmp/minutes.docx")));
    assert_eq!(h.workspace.snapshot().pending_file, None);
    assert_eq!(drain_alerts(&mut h.events), vec![ALERT_NOT_PDF.to_string()]);
}

#[tokio::test]
async fn upload_selects_new_key_and_refreshes_list() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_pdf(&dir, "Fair Work Act.pdf");
    let backend = MockBackend::with_keys(&["raw/0_old.pdf"]).await;
    let mut h = harness_with(backend, MemoryStore::new()).await;

    assert!(h.workspace.choose_file(path));
    assert_eq!(
        h.workspace
            .snapshot()
            .pending_file
            .as_ref()
            .map(|f| f.name.as_str()),
        Some("Fair Work Act.pdf")
    );

    let key = h.workspace.upload().await.expect("uploaded");
    assert_eq!(key, PdfKey::from("raw/1_Fair Work Act.pdf"));

    let snapshot = h.workspace.snapshot();
    assert_eq!(snapshot.selected_key, Some(key.clone()));
    assert_eq!(snapshot.pending_file, None);
    assert_eq!(snapshot.busy, None);
    assert!(snapshot.obligations.is_empty());
    assert_eq!(
        snapshot.all_keys,
        vec![PdfKey::from("raw/0_old.pdf"), key.clone()]
    );
    assert_eq!(
        h.store.get_item(PDF_KEY_PREF).await.expect("get"),
        Some(key.0.clone())
    );
    assert!(drain_alerts(&mut h.events).is_empty());
}

#[tokio::test]
async fn busy_state_brackets_the_upload() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_pdf(&dir, "act.pdf");
    let mut h = harness_with(MockBackend::default(), MemoryStore::new()).await;
    h.workspace.choose_file(path);

    h.workspace.upload().await.expect("uploaded");

    let mut busy_states = Vec::new();
    while let Ok(event) = h.events.try_recv() {
        if let WorkspaceEvent::StateChanged(snapshot) = event {
            busy_states.push(snapshot.busy);
        }
    }
    assert_eq!(
        busy_states.iter().find(|busy| busy.is_some()),
        Some(&Some(BusyOperation::Uploading))
    );
    assert_eq!(busy_states.last(), Some(&None));
}

#[tokio::test]
async fn failed_upload_keeps_file_and_alerts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_pdf(&dir, "act.pdf");
    let backend = MockBackend::default();
    backend.fail("upload-pdf").await;
    let mut h = harness_with(backend, MemoryStore::new()).await;
    h.workspace.choose_file(path);

    assert_eq!(h.workspace.upload().await, None);
    assert!(h.workspace.snapshot().pending_file.is_some());
    assert_eq!(h.workspace.snapshot().busy, None);
    assert_eq!(
        drain_alerts(&mut h.events),
        vec![ALERT_UPLOAD_FAILED.to_string()]
    );
}

#[tokio::test]
async fn deleting_the_selected_pdf_clears_selection() {
    let backend = MockBackend::with_keys(&["raw/1_a.pdf", "raw/2_b.pdf"]).await;
    backend.persist_output("raw/1_a.pdf", &["Keep records"]).await;
    let mut h = harness_with(backend, MemoryStore::new()).await;
    h.workspace.load().await;
    h.workspace.select(Some(PdfKey::from("raw/1_a.pdf"))).await;
    assert!(!h.workspace.snapshot().obligations.is_empty());

    assert!(h.workspace.delete(&PdfKey::from("raw/1_a.pdf")).await);

    let snapshot = h.workspace.snapshot();
    assert_eq!(snapshot.selected_key, None);
    assert_eq!(snapshot.pdf_url, None);
    assert!(snapshot.obligations.is_empty());
    assert_eq!(snapshot.all_keys, vec![PdfKey::from("raw/2_b.pdf")]);
    assert_eq!(h.store.get_item(PDF_KEY_PREF).await.expect("get"), None);
}

#[tokio::test]
async fn deleting_another_pdf_keeps_selection() {
    let backend = MockBackend::with_keys(&["raw/1_a.pdf", "raw/2_b.pdf"]).await;
    let mut h = harness_with(backend, MemoryStore::new()).await;
    h.workspace.select(Some(PdfKey::from("raw/1_a.pdf"))).await;

    assert!(h.workspace.delete(&PdfKey::from("raw/2_b.pdf")).await);
    assert_eq!(
        h.workspace.snapshot().selected_key,
        Some(PdfKey::from("raw/1_a.pdf"))
    );
    assert_eq!(
        h.workspace.snapshot().all_keys,
        vec![PdfKey::from("raw/1_a.pdf")]
    );
}

#[tokio::test]
async fn failed_delete_alerts() {
    let backend = MockBackend::with_keys(&["raw/1_a.pdf"]).await;
    backend.fail("pdf").await;
    let mut h = harness_with(backend, MemoryStore::new()).await;

    assert!(!h.workspace.delete(&PdfKey::from("raw/1_a.pdf")).await);
    assert_eq!(
        drain_alerts(&mut h.events),
        vec![ALERT_DELETE_FAILED.to_string()]
    );
}

#[tokio::test]
async fn run_model_validates_company_before_selection() {
    let mut h = harness_with(MockBackend::default(), MemoryStore::new()).await;

    h.workspace.set_company_input("   ");
    assert_eq!(h.workspace.run_model().await, None);
    h.workspace.set_company_input("ACME");
    assert_eq!(h.workspace.run_model().await, None);

    assert_eq!(
        drain_alerts(&mut h.events),
        vec![ALERT_NO_COMPANY.to_string(), ALERT_NO_SELECTION.to_string()]
    );
    assert!(h.backend.state.lock().await.extract_calls.is_empty());
}

#[tokio::test]
async fn run_model_shows_persisted_output_and_remembers_company() {
    let backend = MockBackend::with_keys(&["raw/1_act.pdf"]).await;
    let mut h = harness_with(backend, MemoryStore::new()).await;
    h.workspace.select(Some(PdfKey::from("raw/1_act.pdf"))).await;
    h.workspace.set_company_input("  ACME Pty Ltd ");

    let obligations = h.workspace.run_model().await.expect("obligations");
    assert_eq!(obligations.len(), 2);
    assert_eq!(h.workspace.snapshot().obligations, obligations);

    let call = h.backend.state.lock().await.extract_calls[0].clone();
    assert_eq!(call.get("company").map(String::as_str), Some("ACME Pty Ltd"));

    assert_eq!(
        h.store
            .get_item(LAST_COMPANY_PREF)
            .await
            .expect("get")
            .as_deref(),
        Some("ACME Pty Ltd")
    );
    let run = h.store.latest_run().await.expect("latest").expect("run");
    assert_eq!(run.company, "ACME Pty Ltd");
    assert_eq!(run.pdf_key, PdfKey::from("raw/1_act.pdf"));
    assert_eq!(h.workspace.snapshot().last_run, Some(run));
}

#[tokio::test]
async fn run_model_displays_what_the_backend_persisted() {
    let backend = MockBackend::with_keys(&["raw/1_act.pdf"]).await;
    backend.state.lock().await.skip_persist = true;
    let mut h = harness_with(backend, MemoryStore::new()).await;
    h.workspace.select(Some(PdfKey::from("raw/1_act.pdf"))).await;
    h.workspace.set_company_input("ACME");

    let obligations = h.workspace.run_model().await.expect("run completes");
    assert!(obligations.is_empty());
    assert!(h.workspace.snapshot().obligations.is_empty());
}

#[tokio::test]
async fn failed_extraction_alerts_and_records_nothing() {
    let backend = MockBackend::with_keys(&["raw/1_act.pdf"]).await;
    backend.fail("extract-s3").await;
    let mut h = harness_with(backend, MemoryStore::new()).await;
    h.workspace.select(Some(PdfKey::from("raw/1_act.pdf"))).await;
    h.workspace.set_company_input("ACME");

    assert_eq!(h.workspace.run_model().await, None);
    assert_eq!(
        drain_alerts(&mut h.events),
        vec![ALERT_EXTRACTION_FAILED.to_string()]
    );
    assert!(h.store.latest_run().await.expect("latest").is_none());
    assert_eq!(h.store.get_item(LAST_COMPANY_PREF).await.expect("get"), None);
}

#[tokio::test]
async fn discover_requires_complete_profile() {
    let mut h = harness_with(MockBackend::default(), MemoryStore::new()).await;
    let response = h
        .workspace
        .discover(CompanyProfile::new("ACME", "", "Australia"))
        .await;
    assert_eq!(response, None);
    assert_eq!(
        drain_alerts(&mut h.events),
        vec![ALERT_INCOMPLETE_PROFILE.to_string()]
    );
    assert!(h.backend.state.lock().await.discover_calls.is_empty());
}

#[tokio::test]
async fn discover_keeps_regulations_and_remembers_profile() {
    let mut h = harness_with(MockBackend::default(), MemoryStore::new()).await;
    let response = h
        .workspace
        .discover(CompanyProfile::new(" ACME ", "Mining services", "Australia"))
        .await
        .expect("discovered");

    assert_eq!(response.key, "company_info/1_ACME.json");
    let discovery = h
        .workspace
        .snapshot()
        .last_discovery
        .clone()
        .expect("discovery");
    assert_eq!(discovery.profile.company_name, "ACME");
    assert_eq!(discovery.response, response);
    assert_eq!(h.workspace.snapshot().company_input, "ACME");
    assert_eq!(
        h.store
            .get_item(LAST_COUNTRY_PREF)
            .await
            .expect("get")
            .as_deref(),
        Some("Australia")
    );
}

#[tokio::test]
async fn failed_discovery_alerts() {
    let backend = MockBackend::default();
    backend.fail("discover").await;
    let mut h = harness_with(backend, MemoryStore::new()).await;

    let response = h
        .workspace
        .discover(CompanyProfile::new("ACME", "Mining", "Australia"))
        .await;
    assert_eq!(response, None);
    assert_eq!(
        drain_alerts(&mut h.events),
        vec![ALERT_DISCOVERY_FAILED.to_string()]
    );
}
