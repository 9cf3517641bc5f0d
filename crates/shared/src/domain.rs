use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix under which uploaded PDFs live in object storage.
pub const RAW_PREFIX: &str = "raw/";
/// Prefix under which the backend persists extraction output.
pub const OUTPUT_PREFIX: &str = "output/";

macro_rules! string_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_newtype!(PdfKey);
string_newtype!(Obligation);

impl PdfKey {
    /// Label shown in PDF listings: the key without its `raw/` prefix.
    pub fn display_name(&self) -> &str {
        self.0.strip_prefix(RAW_PREFIX).unwrap_or(&self.0)
    }

    /// Last path segment of the key with its final extension removed.
    ///
    /// Mirrors the backend's derivation exactly, so a dotfile name yields an
    /// empty base.
    pub fn base_name(&self) -> &str {
        let file_name = self.0.rsplit('/').next().unwrap_or(&self.0);
        file_name
            .rsplit_once('.')
            .map(|(base, _)| base)
            .unwrap_or(file_name)
    }

    /// Key of the derived output document the backend writes for this PDF.
    pub fn output_key(&self) -> String {
        format!("{OUTPUT_PREFIX}{}.json", self.base_name())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub company_name: String,
    pub company_info: String,
    pub location: String,
}

impl CompanyProfile {
    pub fn new(
        company_name: impl Into<String>,
        company_info: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            company_name: company_name.into(),
            company_info: company_info.into(),
            location: location.into(),
        }
    }

    /// Copy with surrounding whitespace removed from every field.
    pub fn trimmed(&self) -> Self {
        Self {
            company_name: self.company_name.trim().to_string(),
            company_info: self.company_info.trim().to_string(),
            location: self.location.trim().to_string(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.company_name.trim().is_empty()
            && !self.company_info.trim().is_empty()
            && !self.location.trim().is_empty()
    }
}

/// A completed model run, kept locally so results survive restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRun {
    pub company: String,
    pub pdf_key: PdfKey,
    pub obligations: Vec<Obligation>,
    pub created_at: DateTime<Utc>,
}
