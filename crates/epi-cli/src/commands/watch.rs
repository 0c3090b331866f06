use std::path::Path;
use std::time::Duration;

use epi_core::sync::SyncScheduler;
use epi_core::SyncPhase;

use crate::commands::common::{load_config, open_service_with_config};
use crate::error::CliError;

pub fn resolve_interval(
    interval_secs: Option<u64>,
    configured: Duration,
) -> Result<Duration, CliError> {
    match interval_secs {
        Some(0) => Err(CliError::InvalidInterval),
        Some(secs) => Ok(Duration::from_secs(secs)),
        None => Ok(configured),
    }
}

pub async fn run_watch(interval_secs: Option<u64>, db_path: &Path) -> Result<(), CliError> {
    let config = load_config()?;
    if !config.is_configured() {
        return Err(CliError::SyncNotConfigured);
    }
    let interval = resolve_interval(interval_secs, config.sync_interval)?;

    let service = open_service_with_config(db_path, &config)?;
    let manager = service.sync_manager().clone();
    let mut phases = manager.subscribe();
    let handle = SyncScheduler::new(manager.clone(), interval).spawn();
    println!("Syncing every {}s; press Ctrl-C to stop", interval.as_secs());

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            }
            changed = phases.changed() => {
                if changed.is_err() {
                    break;
                }
                let phase = *phases.borrow_and_update();
                match phase {
                    SyncPhase::Idle => println!(
                        "Sync idle; {} operations pending",
                        manager.pending_count()?
                    ),
                    SyncPhase::Error => println!("Last sync finished with errors"),
                    SyncPhase::Pushing | SyncPhase::Pulling(_) => {
                        tracing::debug!("Sync phase: {phase:?}");
                    }
                }
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}
