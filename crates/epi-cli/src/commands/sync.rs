use std::path::Path;

use epi_core::remote::RemoteBackend;
use epi_core::sync::SyncOutcome;
use epi_core::Collection;

use crate::commands::common::{
    format_pull_line, format_push_lines, format_sync_lines, open_service, CliService,
};
use crate::error::CliError;

fn open_configured_service(db_path: &Path) -> Result<CliService, CliError> {
    let service = open_service(db_path)?;
    if !service.sync_manager().remote().is_configured() {
        return Err(CliError::SyncNotConfigured);
    }
    Ok(service)
}

pub async fn run_sync(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let service = open_configured_service(db_path)?;
    let outcome = service.sync_manager().sync_all().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    match outcome {
        SyncOutcome::Completed(report) => {
            for line in format_sync_lines(&report) {
                println!("{line}");
            }
        }
        SyncOutcome::Skipped => println!("A sync is already running"),
    }
    Ok(())
}

pub async fn run_push(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let service = open_configured_service(db_path)?;
    let report = service.sync_manager().push().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_push_lines(&report) {
            println!("{line}");
        }
    }
    Ok(())
}

pub async fn run_pull(
    collection: Collection,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let service = open_configured_service(db_path)?;
    let report = service.refresh_from_remote(collection).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", format_pull_line(&report));
    }
    Ok(())
}
