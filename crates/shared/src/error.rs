use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    NotFound,
    Unavailable,
    Internal,
    Unknown,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 413 | 415 | 422 => Self::Validation,
            404 => Self::NotFound,
            502..=504 => Self::Unavailable,
            500..=599 => Self::Internal,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code:?} ({status}): {message}")]
pub struct ApiError {
    pub status: u16,
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            code: ErrorCode::from_status(status),
            message: message.into(),
        }
    }

    /// Builds an error from a non-success response body.
    ///
    /// The backend reports failures as `{"detail": ...}` where `detail` is either
    /// a string or a list of validation entries carrying `msg`. Anything else is
    /// kept as raw text.
    pub fn from_response_body(status: u16, body: &str) -> Self {
        let trimmed = body.trim();
        let message = serde_json::from_str::<Value>(trimmed)
            .ok()
            .and_then(|value| detail_message(&value))
            .unwrap_or_else(|| {
                if trimmed.is_empty() {
                    format!("request failed with status {status}")
                } else {
                    trimmed.to_string()
                }
            });
        Self::new(status, message)
    }
}

fn detail_message(value: &Value) -> Option<String> {
    match value.get("detail")? {
        Value::String(text) => Some(text.clone()),
        Value::Array(entries) => {
            let messages: Vec<String> = entries
                .iter()
                .filter_map(|entry| {
                    let msg = entry.get("msg")?.as_str()?;
                    let field = entry
                        .get("loc")
                        .and_then(Value::as_array)
                        .and_then(|loc| loc.last())
                        .and_then(Value::as_str);
                    Some(match field {
                        Some(field) => format!("{field}: {msg}"),
                        None => msg.to_string(),
                    })
                })
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_string_detail() {
        let err = ApiError::from_response_body(500, r#"{"detail":"S3 upload failed: boom"}"#);
        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(err.message, "S3 upload failed: boom");
    }

    #[test]
    fn joins_validation_details() {
        let body = r#"{"detail":[{"loc":["body","company"],"msg":"field required","type":"missing"}]}"#;
        let err = ApiError::from_response_body(422, body);
        assert_eq!(err.code, ErrorCode::Validation);
        assert_eq!(err.message, "company: field required");
    }

    #[test]
    fn falls_back_to_raw_text_or_status() {
        assert_eq!(
            ApiError::from_response_body(502, "Bad Gateway").message,
            "Bad Gateway"
        );
        let empty = ApiError::from_response_body(404, "  ");
        assert_eq!(empty.code, ErrorCode::NotFound);
        assert_eq!(empty.message, "request failed with status 404");
    }
}
