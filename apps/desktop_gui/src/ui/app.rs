//! App shell: event intake, navbar, status bar, and modal dialogs.

use std::collections::VecDeque;

use arboard::Clipboard;
use client_core::{workspace::DELETE_CONFIRMATION, WorkspaceSnapshot};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use shared::domain::PdfKey;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::{
    events::{UiError, UiEvent},
    orchestration::dispatch_backend_command,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    Upload,
    Results,
    Discover,
    About,
}

impl Page {
    pub const ALL: [Page; 5] = [
        Page::Home,
        Page::Upload,
        Page::Results,
        Page::Discover,
        Page::About,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Page::Home => "Home",
            Page::Upload => "Upload",
            Page::Results => "Results",
            Page::Discover => "Discover",
            Page::About => "About",
        }
    }
}

#[derive(Debug, Default)]
pub struct DiscoverForm {
    pub company_name: String,
    pub company_info: String,
    pub location: String,
}

pub struct AggregatorApp {
    pub(crate) cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    pub(crate) page: Page,
    pub(crate) snapshot: WorkspaceSnapshot,
    pub(crate) company_input: String,
    pub(crate) discover_form: DiscoverForm,
    /// Form fields are seeded once from the restored preferences.
    seeded_from_preferences: bool,
    alerts: VecDeque<String>,
    pub(crate) pending_delete: Option<PdfKey>,
    startup_error: Option<UiError>,
    pub(crate) status: String,
}

impl AggregatorApp {
    pub fn new(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            page: Page::Home,
            snapshot: WorkspaceSnapshot::default(),
            company_input: String::new(),
            discover_form: DiscoverForm::default(),
            seeded_from_preferences: false,
            alerts: VecDeque::new(),
            pending_delete: None,
            startup_error: None,
            status: "Starting...".to_string(),
        }
    }

    pub(crate) fn queue(&mut self, cmd: BackendCommand) {
        dispatch_backend_command(&self.cmd_tx, cmd, &mut self.status);
    }

    pub(crate) fn alert(&mut self, message: impl Into<String>) {
        self.alerts.push_back(message.into());
    }

    pub(crate) fn copy_to_clipboard(&mut self, text: String, what: &str) {
        match Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text)) {
            Ok(()) => self.status = format!("Copied {what} to clipboard"),
            Err(err) => {
                tracing::warn!(error = %err, "clipboard unavailable");
                self.status = format!("Could not copy {what}: {err}");
            }
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::Workspace(snapshot) => self.apply_snapshot(*snapshot),
                UiEvent::Alert(message) => self.alert(message),
                UiEvent::Error(err) => {
                    self.status = err.summary();
                    self.startup_error = Some(err);
                }
            }
        }
    }

    fn apply_snapshot(&mut self, snapshot: WorkspaceSnapshot) {
        if !self.seeded_from_preferences {
            self.seeded_from_preferences = true;
            if self.company_input.is_empty() {
                self.company_input = snapshot.company_input.clone();
            }
            if self.discover_form.company_name.is_empty() {
                self.discover_form.company_name = snapshot.company_input.clone();
            }
            if self.discover_form.location.is_empty() {
                self.discover_form.location = snapshot.last_country.clone();
            }
        }
        if let Some(busy) = snapshot.busy {
            self.status = busy.label().to_string();
        } else if self.snapshot.busy.is_some() {
            self.status = "Ready".to_string();
        }
        self.snapshot = snapshot;
    }

    fn show_navbar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("app_navbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("Aggregator").strong().size(18.0));
                ui.separator();
                for page in Page::ALL {
                    ui.selectable_value(&mut self.page, page, page.label());
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if self.snapshot.is_busy() {
                        ui.spinner();
                    }
                });
            });
        });
    }

    fn show_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("app_status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.small(egui::RichText::new(&self.status).weak());
            });
        });
    }

    fn show_alert_modal(&mut self, ctx: &egui::Context) {
        let Some(message) = self.alerts.front().cloned() else {
            return;
        };
        let mut dismissed = false;
        egui::Window::new("Alert")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(&message);
                ui.add_space(8.0);
                if ui.button("OK").clicked() || ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    dismissed = true;
                }
            });
        if dismissed {
            self.alerts.pop_front();
        }
    }

    fn show_delete_confirmation(&mut self, ctx: &egui::Context) {
        let Some(key) = self.pending_delete.clone() else {
            return;
        };
        let mut decision = None;
        egui::Window::new("Delete PDF")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(DELETE_CONFIRMATION);
                ui.label(egui::RichText::new(key.display_name()).strong());
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Delete").clicked() {
                        decision = Some(true);
                    }
                    if ui.button("Cancel").clicked() {
                        decision = Some(false);
                    }
                });
            });
        match decision {
            Some(true) => {
                self.pending_delete = None;
                self.queue(BackendCommand::Delete(key));
            }
            Some(false) => self.pending_delete = None,
            None => {}
        }
    }

    fn show_startup_error(&mut self, ui: &mut egui::Ui) {
        if let Some(err) = &self.startup_error {
            egui::Frame::group(ui.style()).show(ui, |ui| {
                ui.colored_label(ui.visuals().error_fg_color, err.summary());
            });
            ui.add_space(8.0);
        }
    }
}

impl eframe::App for AggregatorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();

        self.show_navbar(ctx);
        self.show_status_bar(ctx);
        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_startup_error(ui);
            egui::ScrollArea::vertical().show(ui, |ui| match self.page {
                Page::Home => self.show_home(ui),
                Page::Upload => self.show_upload(ui),
                Page::Results => self.show_results(ui),
                Page::Discover => self.show_discover(ui),
                Page::About => self.show_about(ui),
            });
        });
        self.show_delete_confirmation(ctx);
        self.show_alert_modal(ctx);

        if self.snapshot.is_busy() {
            ctx.request_repaint_after(std::time::Duration::from_millis(16));
        } else {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}
