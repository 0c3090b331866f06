//! Remote backend adapters.
//!
//! The sync manager only sees [`RemoteBackend`]; [`SupabaseBackend`] talks to
//! a hosted PostgREST API and [`MemoryBackend`] keeps the authoritative copy
//! in process.

mod memory;
mod supabase;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{Collection, Record};

pub use memory::MemoryBackend;
pub use supabase::SupabaseBackend;

/// Errors reported by a remote backend
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Remote backend is not configured")]
    NotConfigured,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote API error: {0}")]
    Api(String),
    #[error("Invalid remote payload: {0}")]
    Payload(String),
    #[error("Remote call timed out after {0:?}")]
    Timeout(Duration),
    #[error("Remote backend unavailable: {0}")]
    Unavailable(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Collection-level operations against the authoritative backend.
///
/// Tables are addressed through [`Collection::remote_table`]; implementations
/// never see free-form table names.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Whether the backend can be reached at all. `false` means offline-only
    /// mode, which is not an error.
    fn is_configured(&self) -> bool;

    /// Every row of a table, most recently updated first
    async fn fetch_all(&self, collection: Collection) -> RemoteResult<Vec<Record>>;

    /// Rows whose `updated_at` is strictly greater than `cursor`
    async fn fetch_updated_since(
        &self,
        collection: Collection,
        cursor: DateTime<Utc>,
    ) -> RemoteResult<Vec<Record>>;

    /// A single row by id
    async fn fetch_by_id(&self, collection: Collection, id: &str) -> RemoteResult<Option<Record>>;

    /// Insert or replace a row keyed on `id`
    async fn upsert(&self, collection: Collection, record: &Record) -> RemoteResult<()>;

    /// Delete a row by id; deleting a missing row succeeds
    async fn delete(&self, collection: Collection, id: &str) -> RemoteResult<()>;

    /// Cheap round trip proving the backend answers
    async fn check_connection(&self) -> RemoteResult<()>;
}
