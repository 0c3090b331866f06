use std::path::Path;

use epi_core::db::seed_initial_data;

use crate::commands::common::open_service;
use crate::error::CliError;

pub fn run_seed(db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path)?;
    let seeded = seed_initial_data(service.sync_manager().database())?;

    if seeded == 0 {
        println!("Local store already has data; nothing seeded.");
    } else {
        println!("Seeded {seeded} records");
    }
    Ok(())
}
