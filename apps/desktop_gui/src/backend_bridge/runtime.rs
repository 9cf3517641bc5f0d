//! Backend worker: owns the tokio runtime and the upload workspace, executes
//! commands in arrival order, and forwards workspace events to the UI.

use std::{sync::Arc, thread};

use anyhow::{Context, Result};
use client_core::{
    config::Settings, HttpComplianceClient, UploadWorkspace, WorkspaceEvent,
};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use storage::Storage;
use tokio::sync::broadcast;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

pub fn spawn_backend_thread(
    settings: Settings,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let mut workspace = match open_workspace(&settings).await {
                Ok(workspace) => workspace,
                Err(err) => {
                    tracing::error!(error = %format!("{err:#}"), "backend worker startup failure");
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                        UiErrorContext::BackendStartup,
                        format!("{err:#}"),
                    )));
                    return;
                }
            };

            tokio::spawn(forward_workspace_events(
                workspace.subscribe_events(),
                ui_tx.clone(),
            ));
            send_ui_event(
                &ui_tx,
                UiEvent::Workspace(Box::new(workspace.snapshot().clone())),
            );
            let _ = ui_tx.try_send(UiEvent::Info(format!(
                "Connected to {}",
                settings.api_base_url
            )));
            workspace.load().await;

            while let Ok(cmd) = cmd_rx.recv() {
                tracing::debug!(command = cmd.name(), "backend worker handling command");
                match cmd {
                    BackendCommand::RefreshPdfs => {
                        workspace.refresh_keys().await;
                    }
                    BackendCommand::Select(key) => workspace.select(key).await,
                    BackendCommand::ChooseFile(path) => {
                        workspace.choose_file(path);
                    }
                    BackendCommand::ClearFile => workspace.clear_file(),
                    BackendCommand::Upload => {
                        workspace.upload().await;
                    }
                    BackendCommand::Delete(key) => {
                        workspace.delete(&key).await;
                    }
                    BackendCommand::RunModel { company } => {
                        workspace.set_company_input(company);
                        workspace.run_model().await;
                    }
                    BackendCommand::Discover(profile) => {
                        workspace.discover(profile).await;
                    }
                }
            }
            tracing::info!("ui command channel closed; backend worker exiting");
        });
    });
}

async fn open_workspace(settings: &Settings) -> Result<UploadWorkspace> {
    let store = Storage::new(&settings.database_url)
        .await
        .with_context(|| format!("failed to open database {}", settings.database_url))?;
    let api = HttpComplianceClient::from_settings(settings)?;
    Ok(UploadWorkspace::open(Arc::new(api), Arc::new(store)).await)
}

async fn forward_workspace_events(
    mut events: broadcast::Receiver<WorkspaceEvent>,
    ui_tx: Sender<UiEvent>,
) {
    loop {
        let event = match events.recv().await {
            Ok(WorkspaceEvent::StateChanged(snapshot)) => UiEvent::Workspace(Box::new(snapshot)),
            Ok(WorkspaceEvent::Alert(message)) => UiEvent::Alert(message),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "ui forwarder lagged behind workspace events");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        if !send_ui_event(&ui_tx, event) {
            break;
        }
    }
}

/// Returns false once the UI has gone away.
fn send_ui_event(ui_tx: &Sender<UiEvent>, event: UiEvent) -> bool {
    match ui_tx.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::warn!("ui event queue full; dropping workspace event");
            true
        }
        Err(TrySendError::Disconnected(_)) => false,
    }
}
