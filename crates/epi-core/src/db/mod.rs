//! Local persistence: collections, sync queue and pull cursors

mod connection;
mod meta_repository;
mod migrations;
mod queue_repository;
mod record_repository;
mod seed;

pub use connection::Database;
pub use meta_repository::{MetaRepository, SqliteMetaRepository};
pub use queue_repository::{SqliteSyncQueueRepository, SyncQueueRepository};
pub use record_repository::{RecordRepository, SqliteRecordRepository};
pub use seed::seed_initial_data;
