use std::path::Path;

use epi_core::Collection;

use crate::commands::common::{normalize_record_id, open_service};
use crate::error::CliError;

pub fn run_delete(collection: Collection, id: &str, db_path: &Path) -> Result<(), CliError> {
    let id = normalize_record_id(id)?;
    let service = open_service(db_path)?;

    if !service.remove(collection, &id)? {
        tracing::info!("{collection}/{id} had no local copy; remote delete queued anyway");
    }
    println!("{id}");
    Ok(())
}
