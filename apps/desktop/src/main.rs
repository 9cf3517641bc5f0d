use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    process::ExitCode,
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::{load_settings, normalize_database_url, Settings},
    workspace::{
        ALERT_EXTRACTION_FAILED, ALERT_NO_COMPANY, ALERT_NO_SELECTION, DELETE_CONFIRMATION,
        NO_OBLIGATIONS_FOUND,
    },
    ComplianceApi, HttpComplianceClient, PdfUpload, UploadWorkspace, WorkspaceEvent,
};
use shared::domain::{CompanyProfile, ExtractionRun, Obligation, PdfKey};
use storage::{RunHistory, Storage};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "aggregator", about = "Compliance obligations from legislation PDFs")]
struct Cli {
    /// Overrides `api_base_url` from settings.
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Overrides `database_url` from settings.
    #[arg(long, global = true)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List stored PDFs; the selected one is starred.
    List,
    Upload {
        path: PathBuf,
    },
    Delete {
        key: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    Select {
        key: String,
    },
    Unselect,
    /// Print the presigned preview URL.
    Preview {
        key: Option<String>,
    },
    /// Run the model on a stored PDF. Defaults to the saved company and selection.
    Extract {
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        key: Option<String>,
    },
    /// Run the model on a local PDF without storing it.
    ExtractFile {
        #[arg(long)]
        company: String,
        path: PathBuf,
    },
    /// Print the persisted obligations for a PDF.
    Output {
        key: Option<String>,
    },
    Discover {
        #[arg(long)]
        name: String,
        #[arg(long)]
        info: String,
        #[arg(long)]
        location: String,
    },
    History {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    Status,
}

struct Session {
    settings: Settings,
    api: Arc<dyn ComplianceApi>,
    store: Arc<Storage>,
    workspace: UploadWorkspace,
    events: broadcast::Receiver<WorkspaceEvent>,
}

impl Session {
    async fn open(settings: Settings) -> Result<Self> {
        let store = Arc::new(
            Storage::new(&settings.database_url)
                .await
                .with_context(|| format!("failed to open {}", settings.database_url))?,
        );
        let api: Arc<dyn ComplianceApi> = Arc::new(
            HttpComplianceClient::from_settings(&settings).context("invalid api settings")?,
        );
        let workspace = UploadWorkspace::open(api.clone(), store.clone()).await;
        let events = workspace.subscribe_events();
        Ok(Self {
            settings,
            api,
            store,
            workspace,
            events,
        })
    }

    /// Prints pending alerts to stderr; returns whether any were raised.
    fn report_alerts(&mut self) -> bool {
        let mut alerted = false;
        loop {
            match self.events.try_recv() {
                Ok(WorkspaceEvent::Alert(message)) => {
                    eprintln!("{message}");
                    alerted = true;
                }
                Ok(WorkspaceEvent::StateChanged(_)) => {}
                Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                Err(_) => break,
            }
        }
        alerted
    }

    fn key_or_selected(&self, key: Option<String>) -> Option<PdfKey> {
        key.map(PdfKey::from)
            .or_else(|| self.workspace.snapshot().selected_key.clone())
    }
}

fn init_tracing(log_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn format_obligations(obligations: &[Obligation]) -> String {
    if obligations.is_empty() {
        return NO_OBLIGATIONS_FOUND.to_string();
    }
    obligations
        .iter()
        .map(|obligation| format!("- {obligation}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_key_line(key: &PdfKey, selected: bool) -> String {
    let marker = if selected { "*" } else { " " };
    format!("{marker} {}  ({key})", key.display_name())
}

fn format_run(run: &ExtractionRun) -> String {
    format!(
        "{}  {}  {}  {} obligation(s)",
        run.created_at.format("%Y-%m-%d %H:%M"),
        run.company,
        run.pdf_key.display_name(),
        run.obligations.len()
    )
}

/// Stages and uploads a file. A rejected file raises one alert and is not uploaded.
async fn upload_path(workspace: &mut UploadWorkspace, path: PathBuf) -> Option<PdfKey> {
    if !workspace.choose_file(path) {
        return None;
    }
    workspace.upload().await
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("failed to read confirmation")?;
    Ok(is_affirmative(&answer))
}

fn failed(alerted: bool) -> ExitCode {
    if alerted {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

async fn run(cli: Cli, mut session: Session) -> Result<ExitCode> {
    match cli.command {
        Command::List => {
            if !session.workspace.refresh_keys().await {
                anyhow::bail!("could not list stored PDFs");
            }
            let snapshot = session.workspace.snapshot();
            if snapshot.all_keys.is_empty() {
                println!("No PDFs uploaded yet.");
            }
            for key in &snapshot.all_keys {
                println!("{}", format_key_line(key, snapshot.is_selected(key)));
            }
        }
        Command::Upload { path } => {
            if let Some(key) = upload_path(&mut session.workspace, path).await {
                println!("Uploaded {key}");
            }
        }
        Command::Delete { key, yes } => {
            if !yes && !confirm(DELETE_CONFIRMATION)? {
                println!("Cancelled.");
                return Ok(ExitCode::SUCCESS);
            }
            if session.workspace.delete(&PdfKey::from(key.clone())).await {
                println!("Deleted {key}");
            }
        }
        Command::Select { key } => {
            session.workspace.select(Some(PdfKey::from(key))).await;
            let snapshot = session.workspace.snapshot();
            if let Some(key) = &snapshot.selected_key {
                println!("Selected {}", key.display_name());
            }
            if let Some(url) = &snapshot.pdf_url {
                println!("Preview: {url}");
            }
            if !snapshot.obligations.is_empty() {
                println!("{}", format_obligations(&snapshot.obligations));
            }
        }
        Command::Unselect => {
            session.workspace.select(None).await;
            println!("Selection cleared.");
        }
        Command::Preview { key } => {
            let Some(key) = session.key_or_selected(key) else {
                eprintln!("{ALERT_NO_SELECTION}");
                return Ok(ExitCode::FAILURE);
            };
            let url = session
                .api
                .pdf_url(&key)
                .await
                .with_context(|| format!("could not fetch preview url for {key}"))?;
            println!("{url}");
        }
        Command::Extract { company, key } => {
            if let Some(company) = company {
                session.workspace.set_company_input(company);
            }
            if let Some(key) = key {
                session.workspace.select(Some(PdfKey::from(key))).await;
            }
            if let Some(obligations) = session.workspace.run_model().await {
                let company = session.workspace.snapshot().company_input.trim().to_string();
                println!("Obligations for {company}");
                println!("{}", format_obligations(&obligations));
            }
        }
        Command::ExtractFile { company, path } => {
            let company = company.trim().to_string();
            if company.is_empty() {
                eprintln!("{ALERT_NO_COMPANY}");
                return Ok(ExitCode::FAILURE);
            }
            let upload = PdfUpload::from_path(&path).await?;
            match session.api.extract_upload(&company, upload).await {
                Ok(obligations) => println!("{}", format_obligations(&obligations)),
                Err(err) => {
                    tracing::error!(error = %err, "extract_upload failed");
                    eprintln!("{ALERT_EXTRACTION_FAILED}");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Command::Output { key } => {
            let Some(key) = session.key_or_selected(key) else {
                eprintln!("{ALERT_NO_SELECTION}");
                return Ok(ExitCode::FAILURE);
            };
            let obligations = session
                .api
                .fetch_output(&key)
                .await
                .with_context(|| format!("could not fetch output for {key}"))?;
            println!("{}", format_obligations(&obligations));
        }
        Command::Discover {
            name,
            info,
            location,
        } => {
            let profile = CompanyProfile::new(name, info, location);
            if let Some(response) = session.workspace.discover(profile).await {
                println!("Saved as {}", response.key);
                if response.regulations.is_empty() {
                    println!("No regulations found.");
                }
                for regulation in &response.regulations {
                    println!("- {regulation}");
                }
            }
        }
        Command::History { limit } => {
            let runs = session.store.list_runs(limit).await?;
            if runs.is_empty() {
                println!("No model runs yet.");
            }
            for run in &runs {
                println!("{}", format_run(run));
            }
        }
        Command::Status => {
            let snapshot = session.workspace.snapshot().clone();
            println!("api:      {}", session.settings.api_base_url);
            println!("database: {}", session.settings.database_url);
            println!(
                "selected: {}",
                snapshot
                    .selected_key
                    .as_ref()
                    .map(|key| key.display_name().to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
            println!("company:  {}", or_dash(&snapshot.company_input));
            println!("country:  {}", or_dash(&snapshot.last_country));
            match &snapshot.last_run {
                Some(run) => println!("last run: {}", format_run(run)),
                None => println!("last run: -"),
            }
            session.store.health_check().await?;
            match session.api.list_pdfs().await {
                Ok(keys) => println!("backend:  reachable, {} stored PDF(s)", keys.len()),
                Err(err) => println!("backend:  unavailable ({err})"),
            }
        }
    }

    Ok(failed(session.report_alerts()))
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut settings = load_settings()?;
    if let Some(api_url) = &cli.api_url {
        settings.api_base_url = api_url.clone();
    }
    if let Some(database_url) = &cli.database_url {
        settings.database_url = normalize_database_url(database_url);
    }
    init_tracing(&settings.log_filter);

    let session = Session::open(settings).await?;
    run(cli, session).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obligations_print_as_a_bullet_list() {
        let obligations = vec![
            Obligation::from("Register with the regulator"),
            Obligation::from("Keep records for seven years"),
        ];
        assert_eq!(
            format_obligations(&obligations),
            "- Register with the regulator\n- Keep records for seven years"
        );
        assert_eq!(format_obligations(&[]), "No obligations found.");
    }

    #[test]
    fn key_lines_star_the_selection() {
        let key = PdfKey::from("raw/1_act.pdf");
        assert_eq!(format_key_line(&key, true), "* 1_act.pdf  (raw/1_act.pdf)");
        assert_eq!(format_key_line(&key, false), "  1_act.pdf  (raw/1_act.pdf)");
    }

    #[tokio::test]
    async fn non_pdf_upload_raises_a_single_alert() {
        let api = HttpComplianceClient::new(
            "http://127.0.0.1:9/api",
            std::time::Duration::from_secs(1),
        )
        .expect("client");
        let mut workspace =
            UploadWorkspace::open(Arc::new(api), Arc::new(storage::MemoryStore::new())).await;
        let mut events = workspace.subscribe_events();

        assert_eq!(
            upload_path(&mut workspace, PathBuf::from("notes.txt")).await,
            None
        );

        let mut alerts = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let WorkspaceEvent::Alert(message) = event {
                alerts.push(message);
            }
        }
        assert_eq!(alerts, vec![client_core::workspace::ALERT_NOT_PDF.to_string()]);
    }

    #[test]
    fn only_yes_confirms_deletion() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative(" YES "));
        assert!(!is_affirmative("\n"));
        assert!(!is_affirmative("nope"));
    }

    #[test]
    fn cli_parses_global_overrides_after_subcommand() {
        let cli = Cli::try_parse_from([
            "aggregator",
            "extract",
            "--company",
            "ACME",
            "--api-url",
            "http://backend:8000/api",
        ])
        .expect("parse");
        assert_eq!(cli.api_url.as_deref(), Some("http://backend:8000/api"));
        assert!(matches!(
            cli.command,
            Command::Extract { company: Some(ref c), key: None } if c == "ACME"
        ));
    }
}
