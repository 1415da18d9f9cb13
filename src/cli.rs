use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{self, CommandReport};
use crate::logging;

#[derive(Debug, Parser)]
#[command(
    name = "chat-archive",
    version,
    about = "Mirror allow-listed chat channels into a static archive"
)]
struct Cli {
    /// Print the command report as JSON.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch new messages and re-render changed pages.
    Sync,
    /// Rebuild indexes and site metadata from pages on disk, without network access.
    Reindex,
    /// Show effective configuration and cursor state.
    Status,
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", report.to_text());
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init();

    let report = match cli.command {
        Command::Sync => commands::sync::run(),
        Command::Reindex => commands::reindex::run(),
        Command::Status => commands::status::run(),
    };
    let report = report.inspect_err(|err| {
        if let Some(code) = err
            .downcast_ref::<crate::error::ArchiveError>()
            .map(|e| e.code())
        {
            tracing::error!(code, "run aborted");
        }
    })?;
    print_report(&report, cli.json)
}
