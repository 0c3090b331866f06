//! Background trigger surface for sync cycles.
//!
//! Interval ticks, reconnect events and manual triggers all end up in
//! [`SyncManager::sync_all`], so overlapping triggers are dropped by the
//! manager's cycle latch.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::manager::SyncManager;
use super::report::SyncOutcome;
use crate::remote::RemoteBackend;

/// Why a cycle was started
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncTrigger {
    Interval,
    Manual,
    Reconnected,
}

#[derive(Debug)]
enum Command {
    Trigger(SyncTrigger),
    SetOnline(bool),
    Shutdown,
}

/// Periodic and event-driven sync runner
pub struct SyncScheduler<B> {
    manager: Arc<SyncManager<B>>,
    interval: Duration,
    online: bool,
}

impl<B: RemoteBackend + 'static> SyncScheduler<B> {
    pub const fn new(manager: Arc<SyncManager<B>>, interval: Duration) -> Self {
        Self {
            manager,
            interval,
            online: true,
        }
    }

    /// Initial network state; defaults to online
    #[must_use]
    pub const fn with_online(mut self, online: bool) -> Self {
        self.online = online;
        self
    }

    /// Start the scheduler task. The first tick fires immediately.
    pub fn spawn(self) -> SchedulerHandle {
        let (commands, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(receiver));
        SchedulerHandle { commands, task }
    }

    async fn run(self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let Self {
            manager,
            interval,
            mut online,
        } = self;

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!("Sync scheduler started (every {interval:?})");

        loop {
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(Command::Trigger(trigger)) => start_cycle(&manager, trigger),
                    Some(Command::SetOnline(now_online)) => {
                        let reconnected = now_online && !online;
                        online = now_online;
                        tracing::debug!("Network status changed: online={online}");
                        if reconnected {
                            start_cycle(&manager, SyncTrigger::Reconnected);
                        }
                    }
                    Some(Command::Shutdown) | None => break,
                },
                _ = ticker.tick() => {
                    if online && manager.remote().is_configured() {
                        start_cycle(&manager, SyncTrigger::Interval);
                    } else {
                        tracing::debug!("Skipping scheduled sync while offline");
                    }
                }
            }
        }

        tracing::info!("Sync scheduler stopped");
    }
}

fn start_cycle<B: RemoteBackend + 'static>(manager: &Arc<SyncManager<B>>, trigger: SyncTrigger) {
    let manager = Arc::clone(manager);
    tokio::spawn(async move {
        tracing::debug!("Starting sync ({trigger:?})");
        match manager.sync_all().await {
            Ok(SyncOutcome::Completed(report)) if !report.success() => {
                tracing::warn!(
                    "Sync ({trigger:?}) finished with {} failed entries and {} failed pulls",
                    report.push.failed,
                    report.failed_collections().len()
                );
            }
            Ok(SyncOutcome::Completed(_)) => {}
            Ok(SyncOutcome::Skipped) => {
                tracing::debug!("Sync ({trigger:?}) dropped; a cycle is already running");
            }
            Err(error) => tracing::error!("Sync ({trigger:?}) failed: {error}"),
        }
    });
}

/// Control surface of a running [`SyncScheduler`]
pub struct SchedulerHandle {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Request a sync now. Returns `false` once the scheduler has stopped.
    pub fn trigger(&self) -> bool {
        self.commands
            .send(Command::Trigger(SyncTrigger::Manual))
            .is_ok()
    }

    /// Report a network status change; going online starts a sync
    pub fn set_online(&self, online: bool) -> bool {
        self.commands.send(Command::SetOnline(online)).is_ok()
    }

    /// Stop the scheduler and wait for its task to exit.
    ///
    /// A cycle already started keeps running to completion.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Err(error) = self.task.await {
            tracing::error!("Sync scheduler task failed: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, SqliteSyncQueueRepository, SyncQueueRepository};
    use crate::models::{Collection, NewQueueEntry, Record, SyncOperation};
    use crate::remote::MemoryBackend;
    use crate::sync::SyncOptions;

    const HOUR: Duration = Duration::from_secs(3600);

    fn setup() -> (Arc<MemoryBackend>, Arc<SyncManager<MemoryBackend>>) {
        let remote = Arc::new(MemoryBackend::new());
        let db = Arc::new(Database::open_in_memory().unwrap());
        let manager = Arc::new(SyncManager::new(
            db,
            remote.clone(),
            SyncOptions::default(),
        ));
        (remote, manager)
    }

    fn enqueue(manager: &SyncManager<MemoryBackend>, id: &str) {
        let conn = manager.database().connection().unwrap();
        SqliteSyncQueueRepository::new(&conn)
            .enqueue(&NewQueueEntry::write(
                Collection::Estoque,
                SyncOperation::Create,
                Record::new(id),
            ))
            .unwrap();
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_syncs_immediately() {
        let (remote, manager) = setup();
        enqueue(&manager, "EST-001");

        let handle = SyncScheduler::new(manager.clone(), HOUR).spawn();
        settle().await;

        assert_eq!(manager.pending_count().unwrap(), 0);
        assert_eq!(remote.rows(Collection::Estoque).len(), 1);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn interval_keeps_syncing() {
        let (remote, manager) = setup();
        let handle = SyncScheduler::new(manager.clone(), Duration::from_secs(60)).spawn();
        settle().await;

        enqueue(&manager, "EST-002");
        tokio::time::sleep(Duration::from_secs(61)).await;

        assert_eq!(manager.pending_count().unwrap(), 0);
        assert!(remote.row(Collection::Estoque, "EST-002").is_some());
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_wait_for_reconnect() {
        let (remote, manager) = setup();
        enqueue(&manager, "EST-003");

        let handle = SyncScheduler::new(manager.clone(), Duration::from_secs(60))
            .with_online(false)
            .spawn();
        tokio::time::sleep(Duration::from_secs(180)).await;
        assert_eq!(manager.pending_count().unwrap(), 1);
        assert_eq!(remote.write_count(), 0);

        assert!(handle.set_online(true));
        settle().await;
        assert_eq!(manager.pending_count().unwrap(), 0);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn manual_trigger_runs_between_ticks() {
        let (_, manager) = setup();
        let handle = SyncScheduler::new(manager.clone(), HOUR).spawn();
        settle().await;

        enqueue(&manager, "EST-004");
        assert!(handle.trigger());
        settle().await;

        assert_eq!(manager.pending_count().unwrap(), 0);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_during_first_tick_runs_one_cycle() {
        let (remote, manager) = setup();
        enqueue(&manager, "EST-006");
        remote.set_latency(Some(Duration::from_secs(1)));

        let handle = SyncScheduler::new(manager.clone(), HOUR).spawn();
        assert!(handle.trigger());
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(remote.write_count(), 1);
        assert_eq!(manager.pending_count().unwrap(), 0);
        assert!(!manager.is_syncing());
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn tick_during_reconnect_cycle_is_dropped() {
        let (remote, manager) = setup();
        enqueue(&manager, "EST-007");
        remote.set_latency(Some(Duration::from_secs(1)));

        let handle = SyncScheduler::new(manager.clone(), Duration::from_secs(60))
            .with_online(false)
            .spawn();
        tokio::time::sleep(Duration::from_millis(59_500)).await;
        assert_eq!(remote.write_count(), 0);

        // The reconnect write is in flight when the 60s tick fires.
        assert!(handle.set_online(true));
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(remote.write_count(), 1);
        assert_eq!(manager.pending_count().unwrap(), 0);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn unconfigured_backend_skips_ticks() {
        let remote = Arc::new(MemoryBackend::unconfigured());
        let db = Arc::new(Database::open_in_memory().unwrap());
        let manager = Arc::new(SyncManager::new(db, remote, SyncOptions::default()));
        enqueue(&manager, "EST-005");

        let handle = SyncScheduler::new(manager.clone(), Duration::from_secs(60)).spawn();
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert_eq!(manager.pending_count().unwrap(), 1);
        assert!(manager.phase() == crate::SyncPhase::Idle);
        handle.shutdown().await;
    }
}
