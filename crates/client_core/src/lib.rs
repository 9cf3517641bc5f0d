use std::{path::Path, time::Duration};

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, RequestBuilder, Response,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::{CompanyProfile, Obligation, PdfKey},
    error::ApiError,
    protocol::{
        fields, DiscoverResponse, ListPdfsResponse, ObligationResponse, PdfUrlResponse,
        UploadPdfResponse, DELETE_PDF_PATH, DISCOVER_PATH, EXTRACT_STORED_PATH,
        EXTRACT_UPLOAD_PATH, LIST_PDFS_PATH, OUTPUT_PATH, PDF_URL_PATH, UPLOAD_PDF_PATH,
    },
};
use tracing::{debug, info};
use url::Url;

pub mod config;
pub mod error;
pub mod workspace;

pub use error::{ClientError, Result};
pub use workspace::{
    BusyOperation, DiscoveryResult, PendingFile, UploadWorkspace, WorkspaceEvent,
    WorkspaceSnapshot,
};

const PDF_MIME_TYPE: &str = "application/pdf";

/// A local PDF ready to be sent to the backend.
#[derive(Debug, Clone)]
pub struct PdfUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PdfUpload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let content_type = mime_guess::from_path(&filename)
            .first_raw()
            .unwrap_or(PDF_MIME_TYPE)
            .to_string();
        Self {
            filename,
            content_type,
            bytes,
        }
    }

    /// Reads a `.pdf` file from disk. Other extensions are rejected the same way
    /// the file picker filters them.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let filename = file_name_of(path);
        if !is_pdf_path(path) {
            return Err(ClientError::NotPdf(filename));
        }
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ClientError::ReadFile {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(filename, bytes))
    }

    fn into_part(self) -> Result<Part> {
        let content_type = self.content_type;
        Part::bytes(self.bytes)
            .file_name(self.filename)
            .mime_str(&content_type)
            .map_err(|source| ClientError::ContentType {
                content_type: content_type.clone(),
                source,
            })
    }
}

pub fn is_pdf_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Operations the backend API exposes.
#[async_trait]
pub trait ComplianceApi: Send + Sync {
    /// Stores a PDF and returns its storage key.
    async fn upload_pdf(&self, upload: PdfUpload) -> Result<PdfKey>;
    /// Short-lived presigned URL for previewing a stored PDF.
    async fn pdf_url(&self, key: &PdfKey) -> Result<String>;
    async fn list_pdfs(&self) -> Result<Vec<PdfKey>>;
    async fn delete_pdf(&self, key: &PdfKey) -> Result<()>;
    /// Runs extraction against a stored PDF; the backend also persists the output.
    async fn extract_from_storage(&self, company: &str, key: &PdfKey)
        -> Result<Vec<Obligation>>;
    /// One-shot extraction of a local PDF that is not kept by the backend.
    async fn extract_upload(&self, company: &str, upload: PdfUpload) -> Result<Vec<Obligation>>;
    /// Previously persisted obligations for a PDF; empty when none exist yet.
    async fn fetch_output(&self, key: &PdfKey) -> Result<Vec<Obligation>>;
    async fn discover(&self, profile: &CompanyProfile) -> Result<DiscoverResponse>;
}

pub struct HttpComplianceClient {
    http: Client,
    base_url: Url,
}

impl HttpComplianceClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(ClientError::HttpClient)?;
        Self::with_http_client(http, base_url)
    }

    pub fn from_settings(settings: &config::Settings) -> Result<Self> {
        Self::new(
            &settings.api_base_url,
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    pub fn with_http_client(http: Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            http,
            base_url: parse_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &'static str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|err| ClientError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: err.to_string(),
            })
    }

    async fn send(&self, endpoint: &'static str, request: RequestBuilder) -> Result<Response> {
        debug!(endpoint, "api: sending request");
        let response = request
            .send()
            .await
            .map_err(|source| ClientError::transport(endpoint, source))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = ApiError::from_response_body(status.as_u16(), &body);
        debug!(endpoint, status = status.as_u16(), detail = %error.message, "api: request rejected");
        Err(ClientError::Api { endpoint, error })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> Result<T> {
        self.send(endpoint, request)
            .await?
            .json::<T>()
            .await
            .map_err(|source| ClientError::decode(endpoint, source))
    }
}

/// Parses the configured base URL, forcing a trailing slash so endpoint paths
/// are appended rather than replacing the last segment.
fn parse_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&with_slash).map_err(|err| ClientError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: err.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(url)
}

#[async_trait]
impl ComplianceApi for HttpComplianceClient {
    async fn upload_pdf(&self, upload: PdfUpload) -> Result<PdfKey> {
        let filename = upload.filename.clone();
        let size_bytes = upload.bytes.len();
        let form = Form::new().part(fields::PDF, upload.into_part()?);
        let response: UploadPdfResponse = self
            .send_json(
                UPLOAD_PDF_PATH,
                self.http.post(self.endpoint(UPLOAD_PDF_PATH)?).multipart(form),
            )
            .await?;
        info!(%filename, size_bytes, key = %response.key, "api: pdf uploaded");
        Ok(response.key)
    }

    async fn pdf_url(&self, key: &PdfKey) -> Result<String> {
        let response: PdfUrlResponse = self
            .send_json(
                PDF_URL_PATH,
                self.http
                    .get(self.endpoint(PDF_URL_PATH)?)
                    .query(&[(fields::KEY, key.as_str())]),
            )
            .await?;
        Ok(response.url)
    }

    async fn list_pdfs(&self) -> Result<Vec<PdfKey>> {
        let response: ListPdfsResponse = self
            .send_json(LIST_PDFS_PATH, self.http.get(self.endpoint(LIST_PDFS_PATH)?))
            .await?;
        Ok(response.keys)
    }

    async fn delete_pdf(&self, key: &PdfKey) -> Result<()> {
        self.send(
            DELETE_PDF_PATH,
            self.http
                .delete(self.endpoint(DELETE_PDF_PATH)?)
                .query(&[(fields::KEY, key.as_str())]),
        )
        .await?;
        info!(key = %key, "api: pdf deleted");
        Ok(())
    }

    async fn extract_from_storage(
        &self,
        company: &str,
        key: &PdfKey,
    ) -> Result<Vec<Obligation>> {
        let form = Form::new()
            .text(fields::COMPANY, company.to_string())
            .text(fields::KEY, key.0.clone());
        let response: ObligationResponse = self
            .send_json(
                EXTRACT_STORED_PATH,
                self.http
                    .post(self.endpoint(EXTRACT_STORED_PATH)?)
                    .multipart(form),
            )
            .await?;
        info!(key = %key, count = response.obligations.len(), "api: extraction finished");
        Ok(response.obligations)
    }

    async fn extract_upload(&self, company: &str, upload: PdfUpload) -> Result<Vec<Obligation>> {
        let form = Form::new()
            .text(fields::COMPANY, company.to_string())
            .part(fields::PDF, upload.into_part()?);
        let response: ObligationResponse = self
            .send_json(
                EXTRACT_UPLOAD_PATH,
                self.http
                    .post(self.endpoint(EXTRACT_UPLOAD_PATH)?)
                    .multipart(form),
            )
            .await?;
        Ok(response.obligations)
    }

    async fn fetch_output(&self, key: &PdfKey) -> Result<Vec<Obligation>> {
        let response: ObligationResponse = self
            .send_json(
                OUTPUT_PATH,
                self.http
                    .get(self.endpoint(OUTPUT_PATH)?)
                    .query(&[(fields::PDF_KEY, key.as_str())]),
            )
            .await?;
        Ok(response.obligations)
    }

    async fn discover(&self, profile: &CompanyProfile) -> Result<DiscoverResponse> {
        let form = Form::new()
            .text(fields::COMPANY_NAME, profile.company_name.clone())
            .text(fields::COMPANY_INFO, profile.company_info.clone())
            .text(fields::LOCATION, profile.location.clone());
        let response: DiscoverResponse = self
            .send_json(
                DISCOVER_PATH,
                self.http.post(self.endpoint(DISCOVER_PATH)?).multipart(form),
            )
            .await?;
        info!(
            key = %response.key,
            regulations = response.regulations.len(),
            "api: discovery finished"
        );
        Ok(response)
    }
}

#[cfg(test)]
#[path = "tests/mock_backend.rs"]
mod mock_backend;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
