//! Shared sync state types.

use serde::Serialize;

use crate::models::Collection;

/// Where the sync manager currently is within a cycle.
///
/// A cycle moves `Idle -> Pushing -> Pulling(c1) -> ... -> Pulling(cn) -> Idle`.
/// It ends in `Error` instead of `Idle` when any collection failed to pull;
/// the next cycle starts from there as if it were `Idle`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "collection", rename_all = "snake_case")]
pub enum SyncPhase {
    #[default]
    Idle,
    Pushing,
    Pulling(Collection),
    Error,
}

impl SyncPhase {
    /// Whether a cycle is running
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pushing | Self::Pulling(_))
    }
}
