//! Sync manager: queue replay, cursor-based pulls and the trigger scheduler.

mod manager;
mod report;
mod scheduler;

pub use manager::{SyncManager, SyncOptions};
pub use report::{EntryError, PullReport, PushReport, SyncOutcome, SyncReport};
pub use scheduler::{SchedulerHandle, SyncScheduler, SyncTrigger};
