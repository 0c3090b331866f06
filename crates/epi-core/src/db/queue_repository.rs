//! Sync queue: durable log of mutations waiting to reach the remote backend

use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

use crate::error::{Error, Result};
use crate::models::{NewQueueEntry, QueueEntry, Record};
use crate::util::{format_timestamp, parse_timestamp, timestamp_now};

const ENTRY_COLUMNS: &str =
    "entry_id, collection, operation, payload, record_id, enqueued_at, synced, synced_at";

/// Trait for sync queue storage operations
pub trait SyncQueueRepository {
    /// Append a mutation; returns the store-assigned entry id
    fn enqueue(&self, entry: &NewQueueEntry) -> Result<i64>;

    /// Every unsynced entry, oldest first
    fn pending_entries(&self) -> Result<Vec<QueueEntry>>;

    /// Flag an entry as synced. Calling it again leaves the first stamp.
    fn mark_synced(&self, entry_id: i64) -> Result<()>;

    /// Delete every synced entry; returns how many were removed
    fn purge_synced(&self) -> Result<usize>;

    /// Number of unsynced entries
    fn pending_count(&self) -> Result<usize>;

    /// Get an entry by id, synced or not
    fn get(&self, entry_id: i64) -> Result<Option<QueueEntry>>;

    /// Whether any entry is still unsynced
    fn has_pending(&self) -> Result<bool> {
        Ok(self.pending_count()? > 0)
    }
}

/// `SQLite` implementation of `SyncQueueRepository`
pub struct SqliteSyncQueueRepository<'a> {
    conn: &'a Connection,
}

type EntryRow = (
    i64,
    String,
    String,
    Option<String>,
    String,
    String,
    bool,
    Option<String>,
);

impl<'a> SqliteSyncQueueRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntryRow> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
            row.get(7)?,
        ))
    }

    fn into_entry(row: EntryRow) -> Result<QueueEntry> {
        let (entry_id, collection, operation, payload, record_id, enqueued_at, synced, synced_at) =
            row;
        let payload = payload
            .map(|payload| serde_json::from_str::<Record>(&payload))
            .transpose()?;

        Ok(QueueEntry {
            entry_id,
            collection: collection.parse()?,
            operation: operation.parse()?,
            payload,
            record_id,
            enqueued_at: parse_timestamp(&enqueued_at)?,
            synced,
            synced_at: synced_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

impl SyncQueueRepository for SqliteSyncQueueRepository<'_> {
    fn enqueue(&self, entry: &NewQueueEntry) -> Result<i64> {
        let payload = entry
            .payload
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            "INSERT INTO sync_queue (collection, operation, payload, record_id, enqueued_at, synced)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            params![
                entry.collection.as_str(),
                entry.operation.as_str(),
                payload,
                entry.record_id,
                format_timestamp(timestamp_now()),
            ],
        )?;
        let entry_id = self.conn.last_insert_rowid();

        tracing::debug!(
            "Queued {} {}/{} as entry {entry_id}",
            entry.operation,
            entry.collection,
            entry.record_id
        );
        Ok(entry_id)
    }

    fn pending_entries(&self) -> Result<Vec<QueueEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM sync_queue
             WHERE synced = 0
             ORDER BY entry_id ASC"
        ))?;

        let rows = stmt
            .query_map([], Self::parse_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(Self::into_entry).collect()
    }

    fn mark_synced(&self, entry_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE sync_queue SET synced = 1, synced_at = ?2 WHERE entry_id = ?1 AND synced = 0",
            params![entry_id, format_timestamp(timestamp_now())],
        )?;
        Ok(())
    }

    fn purge_synced(&self) -> Result<usize> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let removed = tx.execute("DELETE FROM sync_queue WHERE synced = 1", [])?;
        tx.commit()?;
        Ok(removed)
    }

    fn pending_count(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM sync_queue WHERE synced = 0", [], |row| {
                    row.get(0)
                })?;
        usize::try_from(count).map_err(|error| Error::Database(error.to_string()))
    }

    fn get(&self, entry_id: i64) -> Result<Option<QueueEntry>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM sync_queue WHERE entry_id = ?1"),
                params![entry_id],
                Self::parse_row,
            )
            .optional()?;

        row.map(Self::into_entry).transpose()
    }
}
