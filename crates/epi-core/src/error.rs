//! Error types for epi-core

use thiserror::Error;

/// Result type alias using epi-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by local operations.
///
/// Remote failures are not part of this type: they are recorded in sync
/// reports instead of being propagated (see [`crate::remote::RemoteError`]).
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record or queue entry not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
