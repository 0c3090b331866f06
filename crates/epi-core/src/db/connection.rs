//! Database connection management

use crate::error::{Error, Result};
use crate::models::Collection;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::migrations;

/// Local `SQLite` database holding the collections, the sync queue and the
/// pull cursors.
///
/// A single connection is shared behind a mutex; every repository call locks
/// it for the duration of one statement or one transaction, never across an
/// `.await`.
pub struct Database {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl Database {
    /// Open a database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        let database = Self {
            conn: Mutex::new(conn),
            path: Some(path),
        };
        database.configure()?;
        database.migrate()?;
        Ok(database)
    }

    /// Open an in-memory database (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let database = Self {
            conn: Mutex::new(conn),
            path: None,
        };
        database.configure()?;
        database.migrate()?;
        Ok(database)
    }

    /// Configure `SQLite` for a single-writer client
    fn configure(&self) -> Result<()> {
        let conn = self.connection()?;
        // In-memory databases report `memory` instead of switching to WAL
        if let Err(error) = conn.execute_batch("PRAGMA journal_mode = WAL;") {
            tracing::debug!("WAL journal mode unavailable: {error}");
        }
        conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA cache_size = 10000;",
        )?;
        Ok(())
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.connection()?;
        migrations::run(&conn)
    }

    /// Lock the underlying connection
    pub fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Database("connection lock poisoned".to_string()))
    }

    /// Path of the database file, `None` for in-memory databases
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Remove every record, queue entry and cursor.
    ///
    /// Forces the next sync to start from a full pull.
    pub fn clear_all_local_data(&self) -> Result<()> {
        let conn = self.connection()?;
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;
        for collection in Collection::ALL {
            tx.execute(&format!("DELETE FROM {}", collection.local_table()), [])?;
            tracing::debug!("Cleared local collection {collection}");
        }
        tx.execute("DELETE FROM sync_queue", [])?;
        tx.execute("DELETE FROM meta", [])?;
        tx.commit()?;

        tracing::info!("Cleared all local data");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MetaRepository, SqliteMetaRepository};
    use crate::db::{RecordRepository, SqliteRecordRepository};
    use crate::db::{SqliteSyncQueueRepository, SyncQueueRepository};
    use crate::models::{NewQueueEntry, Record};
    use tempfile::tempdir;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.path().is_none());
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("nested").join("epi.db");

        let db = Database::open(&db_path).unwrap();
        assert_eq!(db.path(), Some(db_path.as_path()));
        assert!(db_path.exists());
    }

    #[test]
    fn test_data_survives_reopen() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("epi.db");

        {
            let db = Database::open(&db_path).unwrap();
            let conn = db.connection().unwrap();
            SqliteRecordRepository::new(&conn)
                .upsert(Collection::Estoque, Record::new("EST-001"))
                .unwrap();
            SqliteSyncQueueRepository::new(&conn)
                .enqueue(&NewQueueEntry::delete(Collection::Prazos, "PRZ-001"))
                .unwrap();
        }

        let db = Database::open(&db_path).unwrap();
        let conn = db.connection().unwrap();
        assert!(SqliteRecordRepository::new(&conn)
            .get_by_id(Collection::Estoque, "EST-001")
            .unwrap()
            .is_some());
        assert_eq!(SqliteSyncQueueRepository::new(&conn).pending_count().unwrap(), 1);
    }

    #[test]
    fn test_clear_all_local_data() {
        let db = Database::open_in_memory().unwrap();
        {
            let conn = db.connection().unwrap();
            SqliteRecordRepository::new(&conn)
                .upsert(Collection::Funcionarios, Record::new("col-01"))
                .unwrap();
            SqliteSyncQueueRepository::new(&conn)
                .enqueue(&NewQueueEntry::delete(Collection::Funcionarios, "col-02"))
                .unwrap();
            SqliteMetaRepository::new(&conn)
                .advance_last_pulled_at(Collection::Funcionarios, chrono::Utc::now())
                .unwrap();
        }

        db.clear_all_local_data().unwrap();

        let conn = db.connection().unwrap();
        assert!(SqliteRecordRepository::new(&conn)
            .get_all(Collection::Funcionarios)
            .unwrap()
            .is_empty());
        assert_eq!(SqliteSyncQueueRepository::new(&conn).pending_count().unwrap(), 0);
        assert!(SqliteMetaRepository::new(&conn)
            .last_pulled_at(Collection::Funcionarios)
            .unwrap()
            .is_none());
    }
}
