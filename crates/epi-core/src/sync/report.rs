//! Structured results of push, pull and full sync cycles.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::Collection;

/// A queue entry that failed to reach the remote backend
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EntryError {
    pub entry_id: i64,
    pub record_id: String,
    pub message: String,
}

/// Outcome of replaying the queue snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PushReport {
    pub pushed: usize,
    pub failed: usize,
    pub errors: Vec<EntryError>,
}

impl PushReport {
    pub const fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Outcome of pulling one collection
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PullReport {
    pub collection: Collection,
    pub pulled: usize,
    pub error: Option<String>,
}

impl PullReport {
    pub(crate) const fn empty(collection: Collection) -> Self {
        Self {
            collection,
            pulled: 0,
            error: None,
        }
    }

    pub const fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregated result of one `push` followed by a pull of every collection
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub push: PushReport,
    pub pulls: Vec<PullReport>,
    pub pushed_total: usize,
    pub pulled_total: usize,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    pub(crate) fn new(push: PushReport, pulls: Vec<PullReport>) -> Self {
        let pulled_total = pulls.iter().map(|pull| pull.pulled).sum();
        Self {
            pushed_total: push.pushed,
            push,
            pulls,
            pulled_total,
            finished_at: Utc::now(),
        }
    }

    /// `true` when no entry failed and every collection pulled cleanly
    pub fn success(&self) -> bool {
        self.push.success() && self.pulls.iter().all(PullReport::success)
    }

    /// Collections whose pull failed this cycle
    pub fn failed_collections(&self) -> Vec<Collection> {
        self.pulls
            .iter()
            .filter(|pull| !pull.success())
            .map(|pull| pull.collection)
            .collect()
    }
}

/// Result of asking for a sync cycle
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "report", rename_all = "snake_case")]
pub enum SyncOutcome {
    Completed(SyncReport),
    /// Another cycle was already running; nothing was done
    Skipped,
}

impl SyncOutcome {
    pub const fn report(&self) -> Option<&SyncReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Skipped => None,
        }
    }

    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }
}
