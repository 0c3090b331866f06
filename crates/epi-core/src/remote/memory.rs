//! In-process authoritative backend.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{RemoteBackend, RemoteError, RemoteResult};
use crate::models::{Collection, Record};

#[derive(Debug, Default)]
struct MemoryState {
    configured: bool,
    tables: HashMap<Collection, BTreeMap<String, Record>>,
    failing_ids: HashSet<String>,
    failing_fetches: HashSet<Collection>,
    latency: Option<Duration>,
    writes: usize,
}

/// Remote backend keeping its tables in memory.
///
/// Several sync managers can share one instance (behind an `Arc`) to act as
/// independent clients of the same authority. Failures and latency can be
/// injected to exercise the partial-failure and timeout paths.
#[derive(Debug)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// A configured, empty backend
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                configured: true,
                ..MemoryState::default()
            }),
        }
    }

    /// An unconfigured backend, as in offline-only mode
    #[must_use]
    pub fn unconfigured() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_configured(&self, configured: bool) {
        self.state().configured = configured;
    }

    /// Make every write touching `id` fail until cleared
    pub fn fail_record(&self, id: impl Into<String>) {
        self.state().failing_ids.insert(id.into());
    }

    /// Make fetches of `collection` fail until cleared
    pub fn fail_fetches(&self, collection: Collection) {
        self.state().failing_fetches.insert(collection);
    }

    pub fn clear_failures(&self) {
        let mut state = self.state();
        state.failing_ids.clear();
        state.failing_fetches.clear();
    }

    /// Delay every remote call by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.state().latency = latency;
    }

    /// Write a row directly, as another writer of the authority would
    pub fn insert_row(&self, collection: Collection, record: Record) {
        self.state()
            .tables
            .entry(collection)
            .or_default()
            .insert(record.id.clone(), record);
    }

    /// Current rows of a table, ordered by id
    #[must_use]
    pub fn rows(&self, collection: Collection) -> Vec<Record> {
        self.state()
            .tables
            .get(&collection)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn row(&self, collection: Collection, id: &str) -> Option<Record> {
        self.state()
            .tables
            .get(&collection)
            .and_then(|table| table.get(id).cloned())
    }

    /// Number of upsert/delete calls that reached the table
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.state().writes
    }

    async fn enter(&self) -> RemoteResult<()> {
        let latency = {
            let state = self.state();
            if !state.configured {
                return Err(RemoteError::NotConfigured);
            }
            state.latency
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(())
    }

    fn read(
        &self,
        collection: Collection,
        filter: impl Fn(&Record) -> bool,
    ) -> RemoteResult<Vec<Record>> {
        let state = self.state();
        if state.failing_fetches.contains(&collection) {
            return Err(RemoteError::Unavailable(format!(
                "fetch of {} rejected",
                collection.remote_table()
            )));
        }

        let mut rows: Vec<Record> = state
            .tables
            .get(&collection)
            .map(|table| table.values().filter(|row| filter(row)).cloned().collect())
            .unwrap_or_default();
        rows.sort_by_key(|row| Reverse(row.updated_at));
        Ok(rows)
    }

    fn write(&self, id: &str, apply: impl FnOnce(&mut MemoryState)) -> RemoteResult<()> {
        let mut state = self.state();
        if state.failing_ids.contains(id) {
            return Err(RemoteError::Api(format!("write of {id} rejected (500)")));
        }
        apply(&mut state);
        state.writes += 1;
        Ok(())
    }
}

#[async_trait]
impl RemoteBackend for MemoryBackend {
    fn is_configured(&self) -> bool {
        self.state().configured
    }

    async fn fetch_all(&self, collection: Collection) -> RemoteResult<Vec<Record>> {
        self.enter().await?;
        self.read(collection, |_| true)
    }

    async fn fetch_updated_since(
        &self,
        collection: Collection,
        cursor: DateTime<Utc>,
    ) -> RemoteResult<Vec<Record>> {
        self.enter().await?;
        self.read(collection, |row| row.updated_at > cursor)
    }

    async fn fetch_by_id(&self, collection: Collection, id: &str) -> RemoteResult<Option<Record>> {
        self.enter().await?;
        Ok(self.read(collection, |row| row.id == id)?.into_iter().next())
    }

    async fn upsert(&self, collection: Collection, record: &Record) -> RemoteResult<()> {
        self.enter().await?;
        self.write(&record.id, |state| {
            state
                .tables
                .entry(collection)
                .or_default()
                .insert(record.id.clone(), record.clone());
        })
    }

    async fn delete(&self, collection: Collection, id: &str) -> RemoteResult<()> {
        self.enter().await?;
        self.write(id, |state| {
            if let Some(table) = state.tables.get_mut(&collection) {
                table.remove(id);
            }
        })
    }

    async fn check_connection(&self) -> RemoteResult<()> {
        self.enter().await
    }
}
