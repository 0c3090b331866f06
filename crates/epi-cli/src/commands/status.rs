use std::path::Path;

use chrono::{DateTime, Utc};
use epi_core::db::{
    MetaRepository, SqliteMetaRepository, SqliteSyncQueueRepository, SyncQueueRepository,
};
use epi_core::remote::RemoteBackend;
use epi_core::{Collection, QueueEntry};
use serde::Serialize;

use crate::commands::common::{format_queue_lines, open_service, CliService};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct CollectionStatus {
    pub collection: Collection,
    pub records: usize,
    pub last_pulled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub remote_configured: bool,
    pub pending_operations: usize,
    pub collections: Vec<CollectionStatus>,
}

pub fn collect_status(service: &CliService) -> Result<StatusReport, CliError> {
    let manager = service.sync_manager();
    let cursors = {
        let conn = manager.database().connection()?;
        SqliteMetaRepository::new(&conn).cursors()?
    };

    let mut collections = Vec::with_capacity(Collection::ALL.len());
    for collection in Collection::ALL {
        collections.push(CollectionStatus {
            collection,
            records: service.count(collection)?,
            last_pulled_at: cursors
                .iter()
                .find(|cursor| cursor.collection == collection)
                .map(|cursor| cursor.last_pulled_at),
        });
    }

    Ok(StatusReport {
        remote_configured: manager.remote().is_configured(),
        pending_operations: manager.pending_count()?,
        collections,
    })
}

pub fn format_status_lines(status: &StatusReport) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Remote: {}",
            if status.remote_configured {
                "configured"
            } else {
                "offline only"
            }
        ),
        format!("Pending operations: {}", status.pending_operations),
    ];
    lines.extend(status.collections.iter().map(|entry| {
        let pulled = entry.last_pulled_at.map_or_else(
            || "never pulled".to_string(),
            |at| format!("pulled {}", at.to_rfc3339()),
        );
        format!(
            "{:<13} {:>5} records, {pulled}",
            entry.collection.as_str(),
            entry.records
        )
    }));
    lines
}

pub fn run_status(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path)?;
    let status = collect_status(&service)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        for line in format_status_lines(&status) {
            println!("{line}");
        }
    }
    Ok(())
}

pub fn pending_entries(service: &CliService) -> Result<Vec<QueueEntry>, CliError> {
    let conn = service.sync_manager().database().connection()?;
    Ok(SqliteSyncQueueRepository::new(&conn).pending_entries()?)
}

pub fn run_queue(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path)?;
    let entries = pending_entries(&service)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        println!("Sync queue is empty.");
    } else {
        for line in format_queue_lines(&entries) {
            println!("{line}");
        }
    }
    Ok(())
}
