use std::path::PathBuf;

use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid api base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} rejected the request: {error}")]
    Api {
        endpoint: &'static str,
        #[source]
        error: ApiError,
    },
    #[error("unexpected response from {endpoint}: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to read '{}': {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid upload content type '{content_type}': {source}")]
    ContentType {
        content_type: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("'{0}' is not a PDF file")]
    NotPdf(String),
}

impl ClientError {
    pub fn transport(endpoint: &'static str, source: reqwest::Error) -> Self {
        Self::Transport { endpoint, source }
    }

    pub fn decode(endpoint: &'static str, source: reqwest::Error) -> Self {
        Self::Decode { endpoint, source }
    }

    /// Backend-provided error details, when the server answered at all.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.api_error()
            .map(|error| error.code == ErrorCode::NotFound)
            .unwrap_or(false)
    }

    /// True when the backend could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Transport { source, .. } => source.is_connect() || source.is_timeout(),
            _ => false,
        }
    }
}
