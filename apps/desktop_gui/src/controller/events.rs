//! UI/backend events and error modeling for desktop GUI controller.

use client_core::WorkspaceSnapshot;

#[derive(Debug, Clone)]
pub enum UiEvent {
    Info(String),
    /// Latest workspace state; each one replaces the previous.
    Workspace(Box<WorkspaceSnapshot>),
    /// User-facing failure shown as a modal.
    Alert(String),
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Transport,
    Storage,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    General,
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("sqlite")
            || message_lower.contains("database")
            || message_lower.contains("migration")
        {
            UiErrorCategory::Storage
        } else if message_lower.contains("invalid")
            || message_lower.contains("missing")
            || message_lower.contains("not a pdf")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("timeout")
            || message_lower.contains("timed out")
            || message_lower.contains("connection")
            || message_lower.contains("unavailable")
            || message_lower.contains("disconnect")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn summary(&self) -> String {
        let label = match self.category {
            UiErrorCategory::Transport => "Network",
            UiErrorCategory::Storage => "Local storage",
            UiErrorCategory::Validation => "Configuration",
            UiErrorCategory::Unknown => "Unexpected",
        };
        match self.context {
            UiErrorContext::BackendStartup => format!("{label} error during startup: {}", self.message),
            UiErrorContext::General => format!("{label} error: {}", self.message),
        }
    }
}
