mod commands;
mod output;
mod version;

use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::{prelude::*, EnvFilter};

use taskwire_core::backend::RestBackend;
use taskwire_core::config::Settings;
use taskwire_core::input::local_today;

use crate::commands::{execute, resolve_owner, Action};
use crate::output::Palette;

#[derive(Parser)]
#[command(
    name = "todo",
    version = version::FULL,
    about = "Personal task tracker"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Add a task: todo add "[P0] Pay rent tomorrow"
    Add {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// List pending tasks
    #[command(visible_alias = "ls")]
    List {
        /// Show every task instead of the first 15
        #[arg(long)]
        all: bool,
    },
    /// Mark a task as done
    #[command(visible_alias = "rm")]
    Done { id: String },
    /// Move a task's due date to tomorrow
    Snooze { id: String },
    /// Add a subtask under an existing task
    Subtask {
        parent_id: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Print the daily digest, or the weekly review with --weekly
    Digest {
        #[arg(long)]
        weekly: bool,
    },
}

impl Command {
    fn into_action(self) -> Result<Action> {
        Ok(match self {
            Command::Add { text } => Action::add(&text)?,
            Command::List { all } => Action::List { all },
            Command::Done { id } => Action::done(&id)?,
            Command::Snooze { id } => Action::snooze(&id)?,
            Command::Subtask { parent_id, text } => Action::subtask(&parent_id, &text)?,
            Command::Digest { weekly } => Action::Digest { weekly },
        })
    }
}

fn init_tracing() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    let filter = EnvFilter::try_new(format!(
        "warn,todo={log_level},taskwire_core={log_level}"
    ))
    .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .init();
}

async fn run(command: Command) -> Result<()> {
    // Bad ids and empty titles are rejected before any configuration or
    // network access.
    let action = command.into_action()?;
    let settings = Settings::load().context("failed to load configuration")?;
    let backend = RestBackend::new(&settings.backend)?;
    let owner = resolve_owner(&backend, &settings, Utc::now()).await?;
    let output = execute(&backend, &owner, action, local_today(), Palette::detect()).await?;
    print!("{output}");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        let _ = Cli::command().print_help();
        println!();
        return ExitCode::SUCCESS;
    };
    match run(command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("❌ {err}");
            ExitCode::FAILURE
        }
    }
}
