//! Pull cursor model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Collection;

/// Watermark of the last fully successful pull of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCursor {
    pub collection: Collection,
    pub last_pulled_at: DateTime<Utc>,
}
