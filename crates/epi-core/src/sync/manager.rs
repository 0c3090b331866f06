//! Push/pull orchestration between the local store and a remote backend.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rusqlite::Connection;
use tokio::sync::watch;

use super::report::{EntryError, PullReport, PushReport, SyncOutcome, SyncReport};
use crate::config::SyncConfig;
use crate::db::{
    Database, MetaRepository, RecordRepository, SqliteMetaRepository, SqliteRecordRepository,
    SqliteSyncQueueRepository, SyncQueueRepository,
};
use crate::error::Result;
use crate::models::{Collection, QueueEntry, SyncOperation};
use crate::remote::{RemoteBackend, RemoteError, RemoteResult};
use crate::state::SyncPhase;
use crate::util::timestamp_now;

/// Tunables for a [`SyncManager`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncOptions {
    /// Upper bound for every single remote call
    pub remote_timeout: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            remote_timeout: config.remote_timeout,
        }
    }
}

/// Releases the cycle latch when dropped
struct CycleGuard<'a> {
    latch: &'a AtomicBool,
}

impl<'a> CycleGuard<'a> {
    fn acquire(latch: &'a AtomicBool) -> Option<Self> {
        latch
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { latch })
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.latch.store(false, Ordering::Release);
    }
}

/// Reconciles the local store with the remote backend.
///
/// `push` replays the sync queue, `pull` fetches remote deltas into the
/// local store and `sync_all` runs a full cycle. Only `sync_all` goes through
/// the cycle latch, so timers, reconnect events and manual triggers should
/// all call it rather than `push`/`pull` directly.
pub struct SyncManager<B> {
    db: Arc<Database>,
    remote: Arc<B>,
    options: SyncOptions,
    in_flight: AtomicBool,
    phase: watch::Sender<SyncPhase>,
}

impl<B: RemoteBackend> SyncManager<B> {
    pub fn new(db: Arc<Database>, remote: Arc<B>, options: SyncOptions) -> Self {
        let (phase, _) = watch::channel(SyncPhase::Idle);
        Self {
            db,
            remote,
            options,
            in_flight: AtomicBool::new(false),
            phase,
        }
    }

    pub const fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub const fn remote(&self) -> &Arc<B> {
        &self.remote
    }

    pub const fn options(&self) -> SyncOptions {
        self.options
    }

    /// Watch phase transitions of every cycle
    pub fn subscribe(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    /// Whether a `sync_all` cycle currently holds the latch
    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn pending_count(&self) -> Result<usize> {
        self.local(|conn| SqliteSyncQueueRepository::new(conn).pending_count())
    }

    pub fn has_pending_operations(&self) -> Result<bool> {
        self.local(|conn| SqliteSyncQueueRepository::new(conn).has_pending())
    }

    /// Replay every pending queue entry against the remote backend.
    ///
    /// The pending list is read once; entries enqueued while the push runs
    /// wait for the next one. A failing entry stays pending and does not stop
    /// the entries after it.
    pub async fn push(&self) -> Result<PushReport> {
        let mut report = PushReport::default();
        if !self.remote.is_configured() {
            tracing::debug!("Remote backend not configured; leaving queue untouched");
            return Ok(report);
        }

        let entries = self.local(|conn| SqliteSyncQueueRepository::new(conn).pending_entries())?;
        if entries.is_empty() {
            tracing::debug!("No pending operations to push");
            return Ok(report);
        }

        for entry in entries {
            match self.replay(&entry).await {
                Ok(()) => {
                    self.local(|conn| {
                        SqliteSyncQueueRepository::new(conn).mark_synced(entry.entry_id)
                    })?;
                    report.pushed += 1;
                    tracing::debug!(
                        "Pushed entry {} ({} {}/{})",
                        entry.entry_id,
                        entry.operation,
                        entry.collection,
                        entry.record_id
                    );
                }
                Err(error) => {
                    tracing::warn!(
                        "Failed to push entry {} ({} {}/{}): {error}",
                        entry.entry_id,
                        entry.operation,
                        entry.collection,
                        entry.record_id
                    );
                    report.failed += 1;
                    report.errors.push(EntryError {
                        entry_id: entry.entry_id,
                        record_id: entry.record_id,
                        message: error.to_string(),
                    });
                }
            }
        }

        let purged = self.local(|conn| SqliteSyncQueueRepository::new(conn).purge_synced())?;
        tracing::debug!("Purged {purged} synced queue entries");
        Ok(report)
    }

    /// Fetch remote changes for one collection into the local store.
    ///
    /// Fetched rows overwrite local copies unconditionally. The cursor only
    /// advances when the fetch and every local write succeeded.
    pub async fn pull(&self, collection: Collection) -> Result<PullReport> {
        let mut report = PullReport::empty(collection);
        if !self.remote.is_configured() {
            tracing::debug!("Remote backend not configured; skipping pull of {collection}");
            return Ok(report);
        }

        let cursor =
            self.local(|conn| SqliteMetaRepository::new(conn).last_pulled_at(collection))?;
        let started_at = timestamp_now();

        let fetched = match cursor {
            Some(cursor) => {
                self.remote_call(self.remote.fetch_updated_since(collection, cursor))
                    .await
            }
            None => self.remote_call(self.remote.fetch_all(collection)).await,
        };
        let records = match fetched {
            Ok(records) => records,
            Err(error) => {
                tracing::warn!("Failed to pull {collection}: {error}");
                report.error = Some(error.to_string());
                return Ok(report);
            }
        };

        report.pulled = records.len();
        self.local(|conn| {
            let records_repo = SqliteRecordRepository::new(conn);
            for record in records {
                records_repo.upsert(collection, record)?;
            }
            SqliteMetaRepository::new(conn).advance_last_pulled_at(collection, started_at)
        })?;

        tracing::debug!("Pulled {} {collection} records", report.pulled);
        Ok(report)
    }

    /// Push, then pull every collection in order.
    ///
    /// Returns [`SyncOutcome::Skipped`] without touching anything when another
    /// cycle is already running.
    pub async fn sync_all(&self) -> Result<SyncOutcome> {
        let Some(_guard) = CycleGuard::acquire(&self.in_flight) else {
            tracing::warn!("Sync already in progress; skipping trigger");
            return Ok(SyncOutcome::Skipped);
        };

        match self.run_cycle().await {
            Ok(report) => {
                let failed = report.failed_collections();
                if failed.is_empty() {
                    self.set_phase(SyncPhase::Idle);
                } else {
                    tracing::warn!("Sync finished with failed pulls: {failed:?}");
                    self.set_phase(SyncPhase::Error);
                }
                tracing::info!(
                    "Sync complete: pushed {}, failed {}, pulled {}",
                    report.pushed_total,
                    report.push.failed,
                    report.pulled_total
                );
                Ok(SyncOutcome::Completed(report))
            }
            Err(error) => {
                self.set_phase(SyncPhase::Error);
                Err(error)
            }
        }
    }

    async fn run_cycle(&self) -> Result<SyncReport> {
        self.set_phase(SyncPhase::Pushing);
        let push = self.push().await?;

        let mut pulls = Vec::with_capacity(Collection::ALL.len());
        for collection in Collection::ALL {
            self.set_phase(SyncPhase::Pulling(collection));
            pulls.push(self.pull(collection).await?);
        }

        Ok(SyncReport::new(push, pulls))
    }

    async fn replay(&self, entry: &QueueEntry) -> RemoteResult<()> {
        match entry.operation {
            SyncOperation::Create | SyncOperation::Update => {
                let mut record = entry.payload.clone().ok_or_else(|| {
                    RemoteError::Payload(format!("entry {} has no payload", entry.entry_id))
                })?;
                record.updated_at = timestamp_now();
                self.remote_call(self.remote.upsert(entry.collection, &record))
                    .await
            }
            SyncOperation::Delete => {
                self.remote_call(self.remote.delete(entry.collection, &entry.record_id))
                    .await
            }
        }
    }

    async fn remote_call<T>(
        &self,
        call: impl Future<Output = RemoteResult<T>> + Send,
    ) -> RemoteResult<T> {
        let limit = self.options.remote_timeout;
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(RemoteError::Timeout(limit)))
    }

    fn local<T>(&self, operation: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.db.connection()?;
        operation(&conn)
    }

    fn set_phase(&self, phase: SyncPhase) {
        self.phase.send_replace(phase);
    }
}
