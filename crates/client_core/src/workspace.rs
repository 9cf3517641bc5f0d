//! Upload page state: stored PDFs, the current selection, staged file, and the
//! obligations shown for the selection.
//!
//! Handlers never return transport errors to the caller. Failures are logged
//! and published as [`WorkspaceEvent::Alert`], the same way every front-end
//! surfaces them.

use std::{path::PathBuf, sync::Arc};

use chrono::Utc;
use shared::{
    domain::{CompanyProfile, ExtractionRun, Obligation, PdfKey},
    protocol::DiscoverResponse,
};
use storage::{LocalStore, LAST_COMPANY_PREF, LAST_COUNTRY_PREF, PDF_KEY_PREF};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::{file_name_of, is_pdf_path, ComplianceApi, PdfUpload};

pub const ALERT_NO_FILE: &str = "Please select a PDF first";
pub const ALERT_NOT_PDF: &str = "Please choose a PDF file";
pub const ALERT_UPLOAD_FAILED: &str = "Upload failed";
pub const ALERT_DELETE_FAILED: &str = "Delete failed";
pub const ALERT_NO_COMPANY: &str = "Please enter a company name";
pub const ALERT_NO_SELECTION: &str = "Please select or upload a PDF first";
pub const ALERT_EXTRACTION_FAILED: &str = "Model extraction failed";
pub const ALERT_INCOMPLETE_PROFILE: &str = "Please fill in company name, description and country";
pub const ALERT_DISCOVERY_FAILED: &str = "Regulation discovery failed";

pub const DELETE_CONFIRMATION: &str = "Delete this PDF permanently?";
/// Shown wherever a finished run produced no obligations.
pub const NO_OBLIGATIONS_FOUND: &str = "No obligations found.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyOperation {
    Uploading,
    Deleting,
    RunningModel,
    Discovering,
}

impl BusyOperation {
    pub fn label(self) -> &'static str {
        match self {
            Self::Uploading => "Uploading…",
            Self::Deleting => "Deleting…",
            Self::RunningModel => "Running Model…",
            Self::Discovering => "Discovering…",
        }
    }
}

/// A local file staged for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub path: PathBuf,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryResult {
    pub profile: CompanyProfile,
    pub response: DiscoverResponse,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceSnapshot {
    pub all_keys: Vec<PdfKey>,
    pub selected_key: Option<PdfKey>,
    pub pdf_url: Option<String>,
    pub pending_file: Option<PendingFile>,
    pub company_input: String,
    pub busy: Option<BusyOperation>,
    pub obligations: Vec<Obligation>,
    pub last_run: Option<ExtractionRun>,
    pub last_discovery: Option<DiscoveryResult>,
    pub last_country: String,
}

impl WorkspaceSnapshot {
    pub fn is_busy(&self) -> bool {
        self.busy.is_some()
    }

    pub fn is_selected(&self, key: &PdfKey) -> bool {
        self.selected_key.as_ref() == Some(key)
    }
}

#[derive(Debug, Clone)]
pub enum WorkspaceEvent {
    StateChanged(WorkspaceSnapshot),
    Alert(String),
}

pub struct UploadWorkspace {
    api: Arc<dyn ComplianceApi>,
    store: Arc<dyn LocalStore>,
    state: WorkspaceSnapshot,
    events: broadcast::Sender<WorkspaceEvent>,
}

impl UploadWorkspace {
    /// Restores the persisted selection, company name and latest run.
    /// Nothing is fetched from the backend until [`UploadWorkspace::load`].
    pub async fn open(api: Arc<dyn ComplianceApi>, store: Arc<dyn LocalStore>) -> Self {
        let (events, _) = broadcast::channel(256);
        let mut state = WorkspaceSnapshot::default();

        match store.get_item(PDF_KEY_PREF).await {
            Ok(key) => state.selected_key = key.filter(|k| !k.is_empty()).map(PdfKey),
            Err(err) => warn!(error = %err, "workspace: failed to restore selected pdf"),
        }
        match store.get_item(LAST_COMPANY_PREF).await {
            Ok(company) => state.company_input = company.unwrap_or_default(),
            Err(err) => warn!(error = %err, "workspace: failed to restore company name"),
        }
        match store.get_item(LAST_COUNTRY_PREF).await {
            Ok(country) => state.last_country = country.unwrap_or_default(),
            Err(err) => warn!(error = %err, "workspace: failed to restore country"),
        }
        match store.latest_run().await {
            Ok(run) => state.last_run = run,
            Err(err) => warn!(error = %err, "workspace: failed to restore latest run"),
        }

        Self {
            api,
            store,
            state,
            events,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<WorkspaceEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> &WorkspaceSnapshot {
        &self.state
    }

    /// Lists stored PDFs and re-applies the restored selection.
    pub async fn load(&mut self) {
        self.refresh_keys().await;
        let restored = self.state.selected_key.clone();
        if restored.is_some() {
            self.select(restored).await;
        } else {
            self.emit();
        }
    }

    /// Reloads the stored PDF list. Failures are logged and keep the old list.
    pub async fn refresh_keys(&mut self) -> bool {
        match self.api.list_pdfs().await {
            Ok(keys) => {
                self.state.all_keys = keys;
                self.emit();
                true
            }
            Err(err) => {
                error!(error = %err, "list_pdfs failed");
                false
            }
        }
    }

    pub fn set_company_input(&mut self, company: impl Into<String>) {
        let company = company.into();
        if self.state.company_input != company {
            self.state.company_input = company;
            self.emit();
        }
    }

    /// Changes the selection, persisting it and loading the preview URL and any
    /// persisted obligations for it. `None` clears all three.
    pub async fn select(&mut self, key: Option<PdfKey>) {
        let Some(key) = key else {
            self.state.selected_key = None;
            self.state.pdf_url = None;
            self.state.obligations.clear();
            if let Err(err) = self.store.remove_item(PDF_KEY_PREF).await {
                warn!(error = %err, "workspace: failed to forget selected pdf");
            }
            self.emit();
            return;
        };

        self.state.selected_key = Some(key.clone());
        if let Err(err) = self.store.set_item(PDF_KEY_PREF, key.as_str()).await {
            warn!(error = %err, "workspace: failed to persist selected pdf");
        }
        self.emit();

        self.state.pdf_url = match self.api.pdf_url(&key).await {
            Ok(url) => Some(url),
            Err(err) => {
                error!(key = %key, error = %err, "pdf_url failed");
                None
            }
        };
        self.state.obligations = match self.api.fetch_output(&key).await {
            Ok(obligations) => obligations,
            Err(err) => {
                error!(key = %key, error = %err, "fetch_output failed");
                Vec::new()
            }
        };
        self.emit();
    }

    /// Stages a local file for the next upload.
    pub fn choose_file(&mut self, path: PathBuf) -> bool {
        if !is_pdf_path(&path) {
            self.alert(ALERT_NOT_PDF);
            return false;
        }
        let name = file_name_of(&path);
        self.state.pending_file = Some(PendingFile { path, name });
        self.emit();
        true
    }

    pub fn clear_file(&mut self) {
        if self.state.pending_file.take().is_some() {
            self.emit();
        }
    }

    /// Uploads the staged file and selects the new key.
    pub async fn upload(&mut self) -> Option<PdfKey> {
        let Some(pending) = self.state.pending_file.clone() else {
            self.alert(ALERT_NO_FILE);
            return None;
        };

        self.begin(BusyOperation::Uploading);
        let api = Arc::clone(&self.api);
        let result = async move {
            let upload = PdfUpload::from_path(&pending.path).await?;
            api.upload_pdf(upload).await
        }
        .await;

        let uploaded = match result {
            Ok(key) => {
                info!(key = %key, "workspace: upload complete");
                self.state.pending_file = None;
                self.state.obligations.clear();
                self.select(Some(key.clone())).await;
                self.refresh_keys().await;
                Some(key)
            }
            Err(err) => {
                error!(error = %err, "upload_pdf failed");
                self.alert(ALERT_UPLOAD_FAILED);
                None
            }
        };
        self.finish();
        uploaded
    }

    /// Deletes a stored PDF. Callers confirm with [`DELETE_CONFIRMATION`] first.
    pub async fn delete(&mut self, key: &PdfKey) -> bool {
        self.begin(BusyOperation::Deleting);
        let deleted = match self.api.delete_pdf(key).await {
            Ok(()) => {
                if self.state.is_selected(key) {
                    self.select(None).await;
                }
                self.refresh_keys().await;
                true
            }
            Err(err) => {
                error!(key = %key, error = %err, "delete_pdf failed");
                self.alert(ALERT_DELETE_FAILED);
                false
            }
        };
        self.finish();
        deleted
    }

    /// Runs extraction for the selected PDF and shows the persisted result.
    pub async fn run_model(&mut self) -> Option<Vec<Obligation>> {
        let company = self.state.company_input.trim().to_string();
        if company.is_empty() {
            self.alert(ALERT_NO_COMPANY);
            return None;
        }
        let Some(key) = self.state.selected_key.clone() else {
            self.alert(ALERT_NO_SELECTION);
            return None;
        };

        self.begin(BusyOperation::RunningModel);
        let api = Arc::clone(&self.api);
        let result = {
            let key = key.clone();
            let company = company.clone();
            async move {
                api.extract_from_storage(&company, &key).await?;
                api.fetch_output(&key).await
            }
            .await
        };

        let obligations = match result {
            Ok(obligations) => {
                self.state.obligations = obligations.clone();
                if let Err(err) = self.store.set_item(LAST_COMPANY_PREF, &company).await {
                    warn!(error = %err, "workspace: failed to persist company name");
                }
                let run = ExtractionRun {
                    company,
                    pdf_key: key,
                    obligations: obligations.clone(),
                    created_at: Utc::now(),
                };
                if let Err(err) = self.store.record_run(&run).await {
                    warn!(error = %err, "workspace: failed to record run");
                }
                self.state.last_run = Some(run);
                Some(obligations)
            }
            Err(err) => {
                error!(key = %key, error = %err, "extract_from_storage failed");
                self.alert(ALERT_EXTRACTION_FAILED);
                None
            }
        };
        self.finish();
        obligations
    }

    /// Submits a company profile and keeps the regulations the backend suggests.
    pub async fn discover(&mut self, profile: CompanyProfile) -> Option<DiscoverResponse> {
        if !profile.is_complete() {
            self.alert(ALERT_INCOMPLETE_PROFILE);
            return None;
        }
        let profile = profile.trimmed();

        self.begin(BusyOperation::Discovering);
        let response = match self.api.discover(&profile).await {
            Ok(response) => {
                for (key, value) in [
                    (LAST_COMPANY_PREF, profile.company_name.as_str()),
                    (LAST_COUNTRY_PREF, profile.location.as_str()),
                ] {
                    if let Err(err) = self.store.set_item(key, value).await {
                        warn!(preference = key, error = %err, "workspace: failed to persist profile");
                    }
                }
                self.state.company_input = profile.company_name.clone();
                self.state.last_country = profile.location.clone();
                self.state.last_discovery = Some(DiscoveryResult {
                    profile,
                    response: response.clone(),
                });
                Some(response)
            }
            Err(err) => {
                error!(error = %err, "discover failed");
                self.alert(ALERT_DISCOVERY_FAILED);
                None
            }
        };
        self.finish();
        response
    }

    fn begin(&mut self, operation: BusyOperation) {
        self.state.busy = Some(operation);
        self.emit();
    }

    fn finish(&mut self) {
        self.state.busy = None;
        self.emit();
    }

    fn emit(&self) {
        let _ = self
            .events
            .send(WorkspaceEvent::StateChanged(self.state.clone()));
    }

    fn alert(&self, message: &str) {
        let _ = self.events.send(WorkspaceEvent::Alert(message.to_string()));
    }
}

#[cfg(test)]
#[path = "tests/workspace_tests.rs"]
mod tests;
