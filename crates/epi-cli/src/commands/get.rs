use std::path::Path;

use epi_core::Collection;

use crate::commands::common::{normalize_record_id, open_service};
use crate::error::CliError;

pub fn run_get(collection: Collection, id: &str, db_path: &Path) -> Result<(), CliError> {
    let id = normalize_record_id(id)?;
    let service = open_service(db_path)?;
    let record = service
        .get(collection, &id)?
        .ok_or_else(|| epi_core::Error::NotFound(format!("{collection}/{id}")))?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
