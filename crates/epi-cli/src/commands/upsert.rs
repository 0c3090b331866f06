use std::path::Path;

use epi_core::Collection;

use crate::commands::common::{open_service, parse_record, read_piped_stdin};
use crate::error::CliError;

pub fn run_upsert(
    collection: Collection,
    json: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    let input = match json {
        Some(json) => json.to_string(),
        None => read_piped_stdin()?.ok_or(CliError::NotAnObject)?,
    };
    let record = parse_record(&input)?;

    let service = open_service(db_path)?;
    let stored = service.upsert(collection, record)?;
    println!("{}", stored.id);
    Ok(())
}
