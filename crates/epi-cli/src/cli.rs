use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use epi_core::Collection;

#[derive(Parser)]
#[command(name = "epi")]
#[command(about = "Offline-first record store with background sync")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List records of a collection
    List {
        /// Collection name (funcionarios, estoque, fornecedores, prazos, lancamentos)
        collection: Collection,
        /// Only records whose field equals the given value (FIELD=VALUE)
        #[arg(long, value_name = "FIELD=VALUE")]
        filter: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a single record
    Get {
        collection: Collection,
        /// Record id
        id: String,
    },
    /// Create or replace a record from a JSON object
    #[command(alias = "put")]
    Upsert {
        collection: Collection,
        /// JSON object; read from stdin when omitted
        json: Option<String>,
    },
    /// Delete a record
    #[command(alias = "rm")]
    Delete {
        collection: Collection,
        /// Record id
        id: String,
    },
    /// Run a sync cycle against the remote backend
    Sync {
        #[command(subcommand)]
        command: Option<SyncCommands>,
        /// Output as JSON
        #[arg(long, global = true)]
        json: bool,
    },
    /// Show queue and cursor status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List pending sync queue entries
    Queue {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Keep syncing in the background until interrupted
    Watch {
        /// Seconds between scheduled syncs (defaults to EPI_SYNC_INTERVAL_SECS)
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },
    /// Load demo records into an empty store
    Seed,
    /// Delete every local record, queue entry and cursor
    Clear {
        /// Skip the safety check
        #[arg(long)]
        yes: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Only replay the pending queue
    Push,
    /// Only pull one collection
    Pull { collection: Collection },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
