//! Backend commands queued from UI to backend worker.

use shared::domain::{CompanyProfile, PdfKey};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCommand {
    RefreshPdfs,
    Select(Option<PdfKey>),
    ChooseFile(PathBuf),
    ClearFile,
    Upload,
    /// Sent only after the user confirmed the deletion.
    Delete(PdfKey),
    RunModel {
        company: String,
    },
    Discover(CompanyProfile),
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RefreshPdfs => "refresh_pdfs",
            Self::Select(_) => "select",
            Self::ChooseFile(_) => "choose_file",
            Self::ClearFile => "clear_file",
            Self::Upload => "upload",
            Self::Delete(_) => "delete",
            Self::RunModel { .. } => "run_model",
            Self::Discover(_) => "discover",
        }
    }
}
