//! Application-facing services shared by every client.

mod records;

pub use records::RecordService;
