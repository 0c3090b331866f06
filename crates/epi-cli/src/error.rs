use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] epi_core::Error),
    #[error(transparent)]
    Remote(#[from] epi_core::remote::RemoteError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Record id cannot be empty")]
    EmptyRecordId,
    #[error("Record must be a JSON object")]
    NotAnObject,
    #[error("Filter must look like FIELD=VALUE, got {0:?}")]
    InvalidFilter(String),
    #[error("Refusing to clear local data without --yes")]
    ClearNotConfirmed,
    #[error("Sync interval must be greater than zero")]
    InvalidInterval,
    #[error(
        "Sync is not configured. Set SUPABASE_URL and SUPABASE_ANON_KEY (or the NEXT_PUBLIC_ variants)."
    )]
    SyncNotConfigured,
}
