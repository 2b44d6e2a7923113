mod watch;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{prelude::*, EnvFilter};

use taskwire_core::backend::RestBackend;
use taskwire_core::config::Settings;
use taskwire_core::document::DocFormat;
use taskwire_core::input::local_today;
use taskwire_core::sync::SyncEngine;

#[derive(Parser)]
#[command(
    name = "taskwire-sync",
    version,
    about = "Mirror pending tasks into a checkbox document and push edits back"
)]
struct Cli {
    /// Document to mirror (defaults to TODO_CLI_FILE)
    #[arg(long, global = true)]
    file: Option<PathBuf>,
    /// Line format: inline or comment
    #[arg(long, global = true)]
    format: Option<DocFormat>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Write the document once and exit
    Export,
    /// Keep the document and the backend in sync (default)
    Watch,
}

fn init_tracing() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_new(format!(
        "warn,taskwire_sync={log_level},taskwire_core={log_level}"
    ))
    .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(filter))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let settings = Settings::load().context("failed to load configuration")?;
    let path = match cli.file {
        Some(path) => path,
        None => settings.require_document()?.to_path_buf(),
    };
    let format = cli.format.unwrap_or(settings.format);
    let backend = RestBackend::new(&settings.backend)?;
    let engine = SyncEngine::new(backend, settings.owner.clone(), path, format);

    match cli.command.unwrap_or(Command::Watch) {
        Command::Export => {
            let count = engine.export(local_today()).await?;
            println!("✅ Exported {} tasks to {}", count, engine.path().display());
        }
        Command::Watch => watch::run(engine, settings.poll_interval).await?,
    }
    Ok(())
}
