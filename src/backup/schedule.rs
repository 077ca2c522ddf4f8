//! Periodic background backups
//!
//! The first run happens one full interval after start. Ticks missed while a
//! backup is still running are skipped rather than queued. Old snapshots are
//! left alone; pruning only happens on request.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::manager::BackupManager;

/// Handle to a running backup schedule
pub struct BackupScheduler {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<u64>,
}

impl BackupScheduler {
    /// Start backing up every `period`
    pub fn start(manager: Arc<BackupManager>, period: Duration) -> Self {
        let (shutdown, mut stop) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut runs = 0u64;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = stop.changed() => {
                        if changed.is_err() || *stop.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                runs += 1;
                match manager.backup_now().await {
                    Ok(outcome) => {
                        info!(run = runs, path = %outcome.path.display(), "scheduled backup done");
                    }
                    Err(e) => warn!(run = runs, error = %e, "scheduled backup failed"),
                }
            }

            debug!(runs, "backup schedule stopped");
            runs
        });

        info!(period_secs = period.as_secs(), "backup schedule started");
        Self { shutdown, task }
    }

    /// Stop the schedule and wait for a running backup to finish
    ///
    /// Returns how many backups were attempted.
    pub async fn stop(self) -> u64 {
        let _ = self.shutdown.send(true);
        self.task.await.unwrap_or(0)
    }
}
