//! epi - command-line client for the offline-first EPI record store
//!
//! Every write lands in the local database first and is queued for the next
//! sync against Supabase.

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, SyncCommands};
use crate::commands::clear::run_clear;
use crate::commands::common::resolve_db_path;
use crate::commands::completions::run_completions;
use crate::commands::delete::run_delete;
use crate::commands::get::run_get;
use crate::commands::list::run_list;
use crate::commands::seed::run_seed;
use crate::commands::status::{run_queue, run_status};
use crate::commands::sync::{run_pull, run_push, run_sync};
use crate::commands::upsert::run_upsert;
use crate::commands::watch::run_watch;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("epi=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Some(Commands::List {
            collection,
            filter,
            json,
        }) => run_list(collection, filter.as_deref(), json, &db_path)?,
        Some(Commands::Get { collection, id }) => run_get(collection, &id, &db_path)?,
        Some(Commands::Upsert { collection, json }) => {
            run_upsert(collection, json.as_deref(), &db_path)?;
        }
        Some(Commands::Delete { collection, id }) => run_delete(collection, &id, &db_path)?,
        Some(Commands::Sync { command, json }) => match command {
            None => run_sync(json, &db_path).await?,
            Some(SyncCommands::Push) => run_push(json, &db_path).await?,
            Some(SyncCommands::Pull { collection }) => run_pull(collection, json, &db_path).await?,
        },
        Some(Commands::Status { json }) => run_status(json, &db_path)?,
        Some(Commands::Queue { json }) => run_queue(json, &db_path)?,
        Some(Commands::Watch { interval }) => run_watch(interval, &db_path).await?,
        Some(Commands::Seed) => run_seed(&db_path)?,
        Some(Commands::Clear { yes }) => run_clear(yes, &db_path)?,
        Some(Commands::Completions { shell, output }) => {
            run_completions(shell, output.as_deref())?;
        }
        None => {
            Cli::command().print_help().map_err(CliError::Io)?;
            println!();
        }
    }

    Ok(())
}
