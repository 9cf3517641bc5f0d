//! Bridge between the UI thread and the backend worker that owns the workspace.

pub mod commands;
pub mod runtime;
