//! UI layer for the desktop GUI: app shell, navbar, modals, and pages.

pub mod app;
pub mod pages;

pub use app::AggregatorApp;
