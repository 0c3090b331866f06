//! Pull cursor storage (`meta` table)

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

use crate::error::Result;
use crate::models::{Collection, SyncCursor};
use crate::util::{format_timestamp, parse_timestamp, truncate_timestamp};

/// Trait for pull cursor storage operations
pub trait MetaRepository {
    /// Watermark of the last successful pull, `None` before the first one
    fn last_pulled_at(&self, collection: Collection) -> Result<Option<DateTime<Utc>>>;

    /// Move the cursor forward to `at`.
    ///
    /// A value older than the stored cursor is ignored; returns the cursor
    /// in effect afterwards.
    fn advance_last_pulled_at(
        &self,
        collection: Collection,
        at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>>;

    /// Every stored cursor, in pull order
    fn cursors(&self) -> Result<Vec<SyncCursor>> {
        let mut cursors = Vec::new();
        for collection in Collection::ALL {
            if let Some(last_pulled_at) = self.last_pulled_at(collection)? {
                cursors.push(SyncCursor {
                    collection,
                    last_pulled_at,
                });
            }
        }
        Ok(cursors)
    }
}

/// `SQLite` implementation of `MetaRepository`
pub struct SqliteMetaRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteMetaRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn read(conn: &Connection, key: &str) -> Result<Option<DateTime<Utc>>> {
        let value: Option<String> = conn
            .query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;

        value.as_deref().map(parse_timestamp).transpose()
    }
}

impl MetaRepository for SqliteMetaRepository<'_> {
    fn last_pulled_at(&self, collection: Collection) -> Result<Option<DateTime<Utc>>> {
        Self::read(self.conn, &collection.cursor_key())
    }

    fn advance_last_pulled_at(
        &self,
        collection: Collection,
        at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let at = truncate_timestamp(at);
        let key = collection.cursor_key();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let current = Self::read(&tx, &key)?;
        let effective = match current {
            Some(current) if current >= at => {
                tracing::debug!(
                    "Keeping cursor for {collection} at {current}; {at} is not newer"
                );
                current
            }
            _ => {
                tx.execute(
                    "INSERT INTO meta (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                    params![key, format_timestamp(at)],
                )?;
                at
            }
        };

        tx.commit()?;
        Ok(effective)
    }
}
