//! Data models for the sync engine

mod collection;
mod queue_entry;
mod record;
mod sync_cursor;

pub use collection::Collection;
pub use queue_entry::{NewQueueEntry, QueueEntry, SyncOperation};
pub use record::Record;
pub use sync_cursor::SyncCursor;
