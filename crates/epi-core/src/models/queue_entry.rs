//! Sync queue entry model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Collection, Record};
use crate::Error;

/// Mutation kind recorded in the sync queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOperation {
    Create,
    Update,
    Delete,
}

impl SyncOperation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncOperation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(Error::InvalidInput(format!("unknown operation: {other}"))),
        }
    }
}

/// A mutation waiting to be enqueued
#[derive(Debug, Clone, PartialEq)]
pub struct NewQueueEntry {
    pub collection: Collection,
    pub operation: SyncOperation,
    pub payload: Option<Record>,
    pub record_id: String,
}

impl NewQueueEntry {
    /// A create/update carrying the stored copy of the record
    #[must_use]
    pub fn write(collection: Collection, operation: SyncOperation, record: Record) -> Self {
        Self {
            collection,
            operation,
            record_id: record.id.clone(),
            payload: Some(record),
        }
    }

    /// A delete carrying only the record id
    #[must_use]
    pub fn delete(collection: Collection, record_id: impl Into<String>) -> Self {
        Self {
            collection,
            operation: SyncOperation::Delete,
            payload: None,
            record_id: record_id.into(),
        }
    }
}

/// One durable, replayable record of an intended remote effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Store-assigned, monotonically increasing identifier
    pub entry_id: i64,
    pub collection: Collection,
    pub operation: SyncOperation,
    /// Full record for create/update, `None` for delete
    pub payload: Option<Record>,
    pub record_id: String,
    pub enqueued_at: DateTime<Utc>,
    pub synced: bool,
    pub synced_at: Option<DateTime<Utc>>,
}
