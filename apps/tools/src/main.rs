use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::config::{load_settings, normalize_database_url};
use storage::{PreferenceStore, RunHistory, Storage};

#[derive(Parser, Debug)]
struct Cli {
    /// Defaults to `database_url` from settings.
    #[arg(long)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every stored preference.
    Prefs,
    Get {
        key: String,
    },
    Set {
        key: String,
        value: String,
    },
    Remove {
        key: String,
    },
    History {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    ClearHistory,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let database_url = match cli.database_url {
        Some(url) => normalize_database_url(&url),
        None => load_settings()?.database_url,
    };
    let storage = Storage::new(&database_url).await?;

    match cli.command {
        Command::Prefs => {
            for (key, value) in storage.items().await? {
                println!("{key}={value}");
            }
        }
        Command::Get { key } => match storage.get_item(&key).await? {
            Some(value) => println!("{value}"),
            None => println!("{key} is not set"),
        },
        Command::Set { key, value } => {
            storage.set_item(&key, &value).await?;
            println!("set {key}");
        }
        Command::Remove { key } => {
            storage.remove_item(&key).await?;
            println!("removed {key}");
        }
        Command::History { limit } => {
            for run in storage.list_runs(limit).await? {
                println!(
                    "{} company={} pdf_key={} obligations={}",
                    run.created_at.to_rfc3339(),
                    run.company,
                    run.pdf_key,
                    run.obligations.len()
                );
            }
        }
        Command::ClearHistory => {
            let removed = storage.clear_runs().await?;
            println!("removed {removed} run(s)");
        }
    }

    Ok(())
}
