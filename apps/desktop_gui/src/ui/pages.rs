//! Page bodies rendered inside the central panel.

use client_core::{
    workspace::{ALERT_NOT_PDF, NO_OBLIGATIONS_FOUND},
    BusyOperation, WorkspaceSnapshot,
};
use eframe::egui;
use shared::domain::{CompanyProfile, Obligation};

use super::app::{AggregatorApp, Page};
use crate::backend_bridge::commands::BackendCommand;

const TAGLINE: &str =
    "Upload legislation, describe your company, and see the obligations that apply to you.";
const ABOUT_TEXT: &str = "Aggregator reads legislation PDFs and asks a language model which \
compliance obligations they place on your company. PDFs are kept in the backend's storage, \
and each model run's output is saved next to them so it can be reopened later.";

pub fn upload_button_label(busy: Option<BusyOperation>) -> &'static str {
    match busy {
        Some(BusyOperation::Uploading) => BusyOperation::Uploading.label(),
        _ => "Upload New PDF",
    }
}

pub fn run_button_label(busy: Option<BusyOperation>) -> &'static str {
    match busy {
        Some(BusyOperation::RunningModel) => BusyOperation::RunningModel.label(),
        _ => "Run Model on Selected PDF",
    }
}

pub fn can_upload(snapshot: &WorkspaceSnapshot) -> bool {
    !snapshot.is_busy() && snapshot.pending_file.is_some()
}

pub fn results_heading(company: &str) -> String {
    format!("Obligations for {company}")
}

/// Plain-text rendering used by the copy buttons.
pub fn obligations_text(obligations: &[Obligation]) -> String {
    if obligations.is_empty() {
        return NO_OBLIGATIONS_FOUND.to_string();
    }
    obligations
        .iter()
        .map(|obligation| format!("- {obligation}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn obligation_list(ui: &mut egui::Ui, obligations: &[Obligation]) {
    for obligation in obligations {
        ui.horizontal_wrapped(|ui| {
            ui.label("•");
            ui.label(obligation.as_str());
        });
    }
}

impl AggregatorApp {
    pub(crate) fn show_home(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(48.0);
            ui.heading(egui::RichText::new("Aggregator").size(32.0).strong());
            ui.add_space(8.0);
            ui.label(TAGLINE);
            ui.add_space(16.0);
            if ui.button("Get Started").clicked() {
                self.page = Page::Upload;
            }
        });
    }

    pub(crate) fn show_upload(&mut self, ui: &mut egui::Ui) {
        ui.columns(2, |columns| {
            self.show_upload_controls(&mut columns[0]);
            self.show_extracted_obligations(&mut columns[1]);
        });
    }

    fn show_upload_controls(&mut self, ui: &mut egui::Ui) {
        ui.heading("Upload Legislation");
        ui.add_space(8.0);

        ui.label(egui::RichText::new("Company name").strong());
        ui.add(
            egui::TextEdit::singleline(&mut self.company_input)
                .hint_text("e.g. ACME Pty Ltd")
                .desired_width(f32::INFINITY),
        );
        ui.add_space(12.0);

        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("Existing PDFs").strong());
            if ui.small_button("Refresh").clicked() {
                self.queue(BackendCommand::RefreshPdfs);
            }
        });
        if self.snapshot.all_keys.is_empty() {
            ui.label(egui::RichText::new("No PDFs uploaded yet.").weak());
        }
        let busy = self.snapshot.is_busy();
        let mut clicked_key = None;
        let mut delete_key = None;
        egui::ScrollArea::vertical()
            .id_salt("existing_pdfs")
            .max_height(220.0)
            .show(ui, |ui| {
                for key in &self.snapshot.all_keys {
                    ui.horizontal(|ui| {
                        let mut text = egui::RichText::new(key.display_name());
                        if self.snapshot.is_selected(key) {
                            text = text.strong();
                        }
                        if ui.link(text).clicked() {
                            clicked_key = Some(key.clone());
                        }
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.add_enabled(!busy, egui::Button::new("Delete")).clicked() {
                                delete_key = Some(key.clone());
                            }
                        });
                    });
                }
            });
        if let Some(key) = clicked_key {
            self.queue(BackendCommand::Select(Some(key)));
        }
        if delete_key.is_some() {
            self.pending_delete = delete_key;
        }
        ui.add_space(12.0);

        ui.horizontal(|ui| {
            if ui.button("Choose PDF…").clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("PDF", &["pdf"])
                    .pick_file()
                {
                    if client_core::is_pdf_path(&path) {
                        self.queue(BackendCommand::ChooseFile(path));
                    } else {
                        self.alert(ALERT_NOT_PDF);
                    }
                }
            }
            if let Some(pending) = &self.snapshot.pending_file {
                ui.label(format!("Selected: {}", pending.name));
                if ui.small_button("✕").clicked() {
                    self.queue(BackendCommand::ClearFile);
                }
            }
        });
        ui.add_space(8.0);

        let upload_label = upload_button_label(self.snapshot.busy);
        if ui
            .add_enabled(can_upload(&self.snapshot), egui::Button::new(upload_label))
            .clicked()
        {
            self.queue(BackendCommand::Upload);
        }

        if let Some(selected) = self.snapshot.selected_key.clone() {
            ui.add_space(12.0);
            ui.separator();
            ui.label(format!("Selected PDF: {}", selected.display_name()));
            if let Some(url) = self.snapshot.pdf_url.clone() {
                ui.horizontal(|ui| {
                    ui.hyperlink_to("Preview PDF", &url);
                    if ui.small_button("Copy link").clicked() {
                        self.copy_to_clipboard(url.clone(), "preview link");
                    }
                });
            }
            ui.add_space(8.0);
            let run_label = run_button_label(self.snapshot.busy);
            if ui.add_enabled(!busy, egui::Button::new(run_label)).clicked() {
                self.queue(BackendCommand::RunModel {
                    company: self.company_input.clone(),
                });
            }
            if ui.small_button("Clear selection").clicked() {
                self.queue(BackendCommand::Select(None));
            }
        }
    }

    fn show_extracted_obligations(&mut self, ui: &mut egui::Ui) {
        ui.heading("Extracted Obligations");
        ui.add_space(8.0);
        if self.snapshot.is_busy() {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Working…");
            });
        } else if self.snapshot.obligations.is_empty() {
            ui.label(egui::RichText::new("No obligations yet.").weak());
        } else {
            obligation_list(ui, &self.snapshot.obligations);
            ui.add_space(8.0);
            if ui.button("Copy all").clicked() {
                self.copy_to_clipboard(obligations_text(&self.snapshot.obligations), "obligations");
            }
        }
    }

    pub(crate) fn show_results(&mut self, ui: &mut egui::Ui) {
        let Some(run) = self.snapshot.last_run.clone() else {
            ui.heading("Results");
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                ui.label("No data,");
                if ui.link("upload first.").clicked() {
                    self.page = Page::Upload;
                }
            });
            return;
        };

        ui.heading(results_heading(&run.company));
        ui.small(format!(
            "{} · {}",
            run.pdf_key.display_name(),
            run.created_at.format("%Y-%m-%d %H:%M UTC")
        ));
        ui.add_space(8.0);
        if run.obligations.is_empty() {
            ui.label(egui::RichText::new(NO_OBLIGATIONS_FOUND).weak());
            return;
        }
        obligation_list(ui, &run.obligations);
        ui.add_space(8.0);
        if ui.button("Copy all").clicked() {
            self.copy_to_clipboard(obligations_text(&run.obligations), "obligations");
        }
    }

    pub(crate) fn show_discover(&mut self, ui: &mut egui::Ui) {
        ui.heading("Discover Regulations");
        ui.label("Describe your company and we'll suggest the regulations that apply.");
        ui.add_space(8.0);

        egui::Grid::new("discover_form")
            .num_columns(2)
            .spacing([12.0, 8.0])
            .show(ui, |ui| {
                ui.label("Company name");
                ui.text_edit_singleline(&mut self.discover_form.company_name);
                ui.end_row();
                ui.label("Description");
                ui.add(
                    egui::TextEdit::multiline(&mut self.discover_form.company_info)
                        .desired_rows(4),
                );
                ui.end_row();
                ui.label("Country");
                ui.text_edit_singleline(&mut self.discover_form.location);
                ui.end_row();
            });
        ui.add_space(8.0);

        let label = match self.snapshot.busy {
            Some(BusyOperation::Discovering) => BusyOperation::Discovering.label(),
            _ => "Discover",
        };
        if ui
            .add_enabled(!self.snapshot.is_busy(), egui::Button::new(label))
            .clicked()
        {
            let profile = CompanyProfile::new(
                self.discover_form.company_name.clone(),
                self.discover_form.company_info.clone(),
                self.discover_form.location.clone(),
            );
            self.queue(BackendCommand::Discover(profile));
        }

        if let Some(discovery) = &self.snapshot.last_discovery {
            ui.add_space(12.0);
            ui.separator();
            ui.label(format!("Saved profile: {}", discovery.response.key));
            ui.add_space(4.0);
            ui.label(egui::RichText::new("Regulations").strong());
            if discovery.response.regulations.is_empty() {
                ui.label(egui::RichText::new("No regulations found.").weak());
            }
            for regulation in &discovery.response.regulations {
                ui.label(format!("• {regulation}"));
            }
        }
    }

    pub(crate) fn show_about(&mut self, ui: &mut egui::Ui) {
        ui.heading("About");
        ui.add_space(8.0);
        ui.label(ABOUT_TEXT);
        ui.add_space(8.0);
        ui.small(format!("Version {}", env!("CARGO_PKG_VERSION")));
    }
}
