pub mod clear;
pub mod common;
pub mod completions;
pub mod delete;
pub mod get;
pub mod list;
pub mod seed;
pub mod status;
pub mod sync;
pub mod upsert;
pub mod watch;
