//! Database migrations

use crate::error::Result;
use crate::models::Collection;
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};

/// Current schema version
pub const CURRENT_VERSION: i32 = 3;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }
    if version < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

/// Get the current schema version
pub fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0);

    Ok(version)
}

fn apply(conn: &Connection, version: i32, statements: &[String]) -> Result<()> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    for stmt in statements {
        tx.execute_batch(stmt)?;
    }
    tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    tx.commit()?;

    tracing::info!("Migrated database to version {version}");
    Ok(())
}

/// Migration to version 1: collection tables, sync queue and meta
fn migrate_v1(conn: &Connection) -> Result<()> {
    let mut statements = vec![
        // Schema version tracking
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )"
        .to_string(),
        // Pending mutations, append-only until marked synced
        "CREATE TABLE IF NOT EXISTS sync_queue (
            entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
            collection TEXT NOT NULL,
            operation TEXT NOT NULL CHECK (operation IN ('create', 'update', 'delete')),
            payload TEXT,
            record_id TEXT NOT NULL,
            enqueued_at TEXT NOT NULL,
            synced INTEGER NOT NULL DEFAULT 0,
            synced_at TEXT
        )"
        .to_string(),
        // Pull cursors (`last_sync_<collection>`)
        "CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )"
        .to_string(),
    ];

    for collection in Collection::ALL {
        let table = collection.local_table();
        statements.push(format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )"
        ));
        statements.push(format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_updated ON {table}(updated_at DESC)"
        ));
    }

    apply(conn, 1, &statements)
}

/// Migration to version 2: index for pending-entry scans
fn migrate_v2(conn: &Connection) -> Result<()> {
    let statements = [
        "CREATE INDEX IF NOT EXISTS idx_sync_queue_pending
         ON sync_queue(synced, enqueued_at, entry_id)"
            .to_string(),
        "CREATE INDEX IF NOT EXISTS idx_sync_queue_record ON sync_queue(collection, record_id)"
            .to_string(),
    ];

    apply(conn, 2, &statements)
}

/// Migration to version 3: pending scans follow entry id order only
fn migrate_v3(conn: &Connection) -> Result<()> {
    let statements = [
        "DROP INDEX IF EXISTS idx_sync_queue_pending".to_string(),
        "CREATE INDEX IF NOT EXISTS idx_sync_queue_pending ON sync_queue(synced, entry_id)"
            .to_string(),
    ];

    apply(conn, 3, &statements)
}
