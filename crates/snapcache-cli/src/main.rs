//! snapcache CLI
//!
//! Runs one snapshot-and-reconcile job against the configured record store
//! and sink. Exit codes: 0 full success, 1 fatal stage failure (nothing
//! published), 2 published but reconciliation incomplete.

use clap::{Parser, Subcommand};
use std::process::ExitCode;

mod commands;
mod config;

#[derive(Debug, Parser)]
#[command(name = "snapcache")]
#[command(about = "Snapshot a document store into a published artifact", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Execute one snapshot run (read, encode, publish, reconcile)
    Run(commands::run::RunArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => commands::run::execute(args).await,
    }
}
