mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{
    import::ImportArgs,
    report::ReportCommands,
    serve::ServeArgs,
    stats::StatsArgs,
};

#[derive(Parser)]
#[command(author, version, about = "Siaga disaster report engine CLI")]
struct Cli {
    /// Path to the configuration file. Defaults to ~/.config/siaga/config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve(ServeArgs),
    /// Manage submitted reports
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Merge a yearly CSV export into the aggregate ledger
    Import(ImportArgs),
    /// Show per-type totals for one year
    Stats(StatsArgs),
    /// Show the per-district breakdown for one year
    Breakdown(StatsArgs),
    /// List the known districts
    Districts,
}

#[tokio::main]
async fn main() -> Result<()> {
    siaga::logging::init()?;

    let Cli { config, command } = Cli::parse();

    match command {
        Commands::Serve(args) => commands::serve::execute(config, args).await?,
        Commands::Report { command } => commands::report::execute(config, command)?,
        Commands::Import(args) => commands::import::execute(config, args)?,
        Commands::Stats(args) => commands::stats::totals(config, args)?,
        Commands::Breakdown(args) => commands::stats::breakdown(config, args)?,
        Commands::Districts => commands::stats::districts(config)?,
    }

    Ok(())
}
