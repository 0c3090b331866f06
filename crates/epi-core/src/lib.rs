//! epi-core - Offline-first sync engine for EPI records
//!
//! This crate contains the local store, the durable sync queue, the remote
//! backend adapters and the sync manager that reconciles them. Interfaces
//! (CLI, dashboards) only talk to the record facade in [`services`].

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod services;
pub mod state;
pub mod sync;
mod util;

pub use error::{Error, Result};
pub use models::{Collection, QueueEntry, Record, SyncOperation};
pub use state::SyncPhase;
