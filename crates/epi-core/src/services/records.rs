//! Record facade: local-first CRUD that feeds the sync queue.

use std::sync::Arc;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde_json::Value;
use uuid::Uuid;

use crate::db::{
    seed_initial_data, Database, RecordRepository, SqliteRecordRepository,
    SqliteSyncQueueRepository, SyncQueueRepository,
};
use crate::models::{Collection, NewQueueEntry, Record, SyncOperation};
use crate::remote::RemoteBackend;
use crate::sync::{PullReport, SyncManager};
use crate::Result;

/// CRUD over the local store.
///
/// Every mutation is written locally first and then queued for the next
/// push; nothing here waits on the network except the explicit refresh.
pub struct RecordService<B> {
    manager: Arc<SyncManager<B>>,
}

impl<B> Clone for RecordService<B> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
        }
    }
}

impl<B: RemoteBackend> RecordService<B> {
    pub const fn new(manager: Arc<SyncManager<B>>) -> Self {
        Self { manager }
    }

    pub const fn sync_manager(&self) -> &Arc<SyncManager<B>> {
        &self.manager
    }

    fn database(&self) -> &Database {
        self.manager.database()
    }

    fn with_conn<T>(&self, operation: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.database().connection()?;
        operation(&conn)
    }

    /// Create or replace a record and queue it for push.
    ///
    /// The local write and the queue entry commit together. The operation is
    /// `create` when no local copy exists yet, `update` otherwise. A blank id
    /// is replaced by a fresh UUID v7.
    pub fn upsert(&self, collection: Collection, mut record: Record) -> Result<Record> {
        if record.id.trim().is_empty() {
            record.id = Uuid::now_v7().to_string();
        }

        self.with_conn(|conn| {
            let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
            let records = SqliteRecordRepository::new(&tx);
            let operation = if records.get_by_id(collection, &record.id)?.is_some() {
                SyncOperation::Update
            } else {
                SyncOperation::Create
            };

            let stored = records.upsert(collection, record)?;
            SqliteSyncQueueRepository::new(&tx).enqueue(&NewQueueEntry::write(
                collection,
                operation,
                stored.clone(),
            ))?;
            tx.commit()?;

            tracing::debug!("Saved {collection}/{} ({operation})", stored.id);
            Ok(stored)
        })
    }

    /// Delete a record locally and queue the remote delete.
    ///
    /// The delete is queued even when no local copy existed, since the
    /// remote may still hold one. Returns whether a local row was removed.
    pub fn remove(&self, collection: Collection, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
            let removed = SqliteRecordRepository::new(&tx).delete(collection, id)?;
            SqliteSyncQueueRepository::new(&tx).enqueue(&NewQueueEntry::delete(collection, id))?;
            tx.commit()?;
            Ok(removed)
        })
    }

    pub fn list(&self, collection: Collection) -> Result<Vec<Record>> {
        self.with_conn(|conn| SqliteRecordRepository::new(conn).get_all(collection))
    }

    pub fn get(&self, collection: Collection, id: &str) -> Result<Option<Record>> {
        self.with_conn(|conn| SqliteRecordRepository::new(conn).get_by_id(collection, id))
    }

    /// Records whose top-level `field` equals `value`
    pub fn find_by_field(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Record>> {
        self.with_conn(|conn| {
            SqliteRecordRepository::new(conn).find_by_field(collection, field, value)
        })
    }

    pub fn count(&self, collection: Collection) -> Result<usize> {
        self.with_conn(|conn| SqliteRecordRepository::new(conn).count(collection))
    }

    /// Pull one collection outside of a full cycle
    pub async fn refresh_from_remote(&self, collection: Collection) -> Result<PullReport> {
        self.manager.pull(collection).await
    }

    /// Refresh a collection and return its records.
    ///
    /// A failed refresh is logged and the local copy is served. When the
    /// whole local store is still empty the demo data is seeded first.
    pub async fn load(&self, collection: Collection) -> Result<Vec<Record>> {
        let report = self.refresh_from_remote(collection).await?;
        if let Some(error) = &report.error {
            tracing::warn!("Serving local {collection} after failed refresh: {error}");
        }

        let records = self.list(collection)?;
        if !records.is_empty() {
            return Ok(records);
        }

        if seed_initial_data(self.database())? > 0 {
            return self.list(collection);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryBackend;
    use crate::sync::SyncOptions;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn setup_with(remote: Arc<MemoryBackend>) -> RecordService<MemoryBackend> {
        let db = Arc::new(Database::open_in_memory().unwrap());
        RecordService::new(Arc::new(SyncManager::new(
            db,
            remote,
            SyncOptions::default(),
        )))
    }

    fn setup() -> RecordService<MemoryBackend> {
        setup_with(Arc::new(MemoryBackend::unconfigured()))
    }

    fn pending_operations(service: &RecordService<MemoryBackend>) -> Vec<SyncOperation> {
        service
            .with_conn(|conn| SqliteSyncQueueRepository::new(conn).pending_entries())
            .unwrap()
            .into_iter()
            .map(|entry| entry.operation)
            .collect()
    }

    #[test]
    fn upsert_detects_create_then_update() {
        let service = setup();
        let record = Record::new("EST-001").with_field("estoqueAtual", 150);

        service.upsert(Collection::Estoque, record.clone()).unwrap();
        service
            .upsert(Collection::Estoque, record.with_field("estoqueAtual", 178))
            .unwrap();

        assert_eq!(
            pending_operations(&service),
            vec![SyncOperation::Create, SyncOperation::Update]
        );
        let stored = service.get(Collection::Estoque, "EST-001").unwrap().unwrap();
        assert_eq!(stored.field("estoqueAtual"), Some(&json!(178)));
    }

    #[test]
    fn upsert_queues_the_stored_copy() {
        let service = setup();
        let stored = service
            .upsert(Collection::Prazos, Record::new("PRZ-001"))
            .unwrap();

        let queued = service
            .with_conn(|conn| SqliteSyncQueueRepository::new(conn).pending_entries())
            .unwrap();
        assert_eq!(queued[0].payload.as_ref(), Some(&stored));
    }

    #[test]
    fn upsert_assigns_id_when_blank() {
        let service = setup();
        let stored = service
            .upsert(
                Collection::Fornecedores,
                Record::new("  ").with_field("nome", "Sem id"),
            )
            .unwrap();

        assert!(Uuid::parse_str(&stored.id).is_ok());
        assert_eq!(service.count(Collection::Fornecedores).unwrap(), 1);
    }

    #[test]
    fn remove_queues_delete_even_without_local_copy() {
        let service = setup();
        service
            .upsert(Collection::Funcionarios, Record::new("col-01"))
            .unwrap();

        assert!(service.remove(Collection::Funcionarios, "col-01").unwrap());
        assert!(!service.remove(Collection::Funcionarios, "col-99").unwrap());

        assert_eq!(
            pending_operations(&service),
            vec![
                SyncOperation::Create,
                SyncOperation::Delete,
                SyncOperation::Delete
            ]
        );
        assert!(service.list(Collection::Funcionarios).unwrap().is_empty());
    }

    #[test]
    fn find_by_field_filters_records() {
        let service = setup();
        service
            .upsert(
                Collection::Lancamentos,
                Record::new("lanc-01").with_field("tipo", "entrada"),
            )
            .unwrap();
        service
            .upsert(
                Collection::Lancamentos,
                Record::new("lanc-02").with_field("tipo", "saida"),
            )
            .unwrap();

        let found = service
            .find_by_field(Collection::Lancamentos, "tipo", &json!("saida"))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "lanc-02");
    }

    #[tokio::test]
    async fn load_seeds_empty_store_when_offline() {
        let service = setup();

        let records = service.load(Collection::Funcionarios).await.unwrap();

        assert!(!records.is_empty());
        assert_eq!(service.sync_manager().pending_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn load_prefers_remote_rows() {
        let remote = Arc::new(MemoryBackend::new());
        remote.insert_row(
            Collection::Estoque,
            Record::new("EST-100").with_field("nome", "Luva nitrílica"),
        );
        let service = setup_with(remote);

        let records = service.load(Collection::Estoque).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "EST-100");
    }
}
