//! Wire bodies exchanged with the backend API.

use serde::{Deserialize, Serialize};

use crate::domain::{Obligation, PdfKey};

pub const UPLOAD_PDF_PATH: &str = "upload-pdf";
pub const PDF_URL_PATH: &str = "pdf-url";
pub const LIST_PDFS_PATH: &str = "list-pdfs";
pub const DELETE_PDF_PATH: &str = "pdf";
pub const EXTRACT_STORED_PATH: &str = "extract-s3";
pub const EXTRACT_UPLOAD_PATH: &str = "extract";
pub const OUTPUT_PATH: &str = "output";
pub const DISCOVER_PATH: &str = "discover";

pub mod fields {
    pub const PDF: &str = "pdf";
    pub const KEY: &str = "key";
    pub const PDF_KEY: &str = "pdfKey";
    pub const COMPANY: &str = "company";
    pub const COMPANY_NAME: &str = "companyName";
    pub const COMPANY_INFO: &str = "companyInfo";
    pub const LOCATION: &str = "location";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadPdfResponse {
    pub key: PdfKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfUrlResponse {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPdfsResponse {
    #[serde(default)]
    pub keys: Vec<PdfKey>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObligationResponse {
    #[serde(default)]
    pub obligations: Vec<Obligation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoverResponse {
    pub key: String,
    #[serde(default)]
    pub regulations: Vec<String>,
}
