use std::path::Path;

use crate::commands::common::open_service;
use crate::error::CliError;

pub fn run_clear(confirmed: bool, db_path: &Path) -> Result<(), CliError> {
    if !confirmed {
        return Err(CliError::ClearNotConfirmed);
    }

    let service = open_service(db_path)?;
    let pending = service.sync_manager().pending_count()?;
    if pending > 0 {
        tracing::warn!("Discarding {pending} operations that were never pushed");
    }

    service.sync_manager().database().clear_all_local_data()?;
    println!("Local data cleared");
    Ok(())
}
