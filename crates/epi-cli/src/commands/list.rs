use std::path::Path;

use chrono::Utc;
use epi_core::Collection;

use crate::commands::common::{format_record_lines, open_service, parse_filter};
use crate::error::CliError;

pub fn run_list(
    collection: Collection,
    filter: Option<&str>,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let service = open_service(db_path)?;
    let records = match filter {
        Some(filter) => {
            let (field, value) = parse_filter(filter)?;
            service.find_by_field(collection, &field, &value)?
        }
        None => service.list(collection)?,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else if records.is_empty() {
        println!("No {collection} records.");
    } else {
        for line in format_record_lines(&records, Utc::now()) {
            println!("{line}");
        }
    }

    Ok(())
}
