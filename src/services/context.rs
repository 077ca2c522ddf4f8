//! Process-wide wiring
//!
//! [`AppContext`] is the process root: it owns the remount coordinator, the
//! live handle and the remount worker serving it, and hands out the ledger
//! store built on top of them.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::paths::LedgerPaths;
use crate::config::settings::Settings;
use crate::db::{spawn_remount_worker, DatabaseLocation, LiveDatabase, RemountCoordinator, RemountTimings};
use crate::error::LedgerResult;
use crate::ledger::LedgerStore;
use crate::recovery::{Recovery, RetryPolicy};

/// Everything that lives as long as the process
pub struct AppContext {
    paths: LedgerPaths,
    settings: Settings,
    db: Arc<LiveDatabase>,
    worker: JoinHandle<()>,
}

impl AppContext {
    /// Open the live database and start serving remount requests
    pub async fn open(paths: LedgerPaths, settings: Settings) -> LedgerResult<Self> {
        paths.ensure_directories()?;
        let coordinator = Arc::new(RemountCoordinator::new(RemountTimings::from(
            &settings.recovery,
        )));
        let location = DatabaseLocation::from_settings(&paths, &settings.database);
        let db = LiveDatabase::open(location, coordinator).await?;
        let worker = spawn_remount_worker(Arc::clone(&db));

        Ok(Self {
            paths,
            settings,
            db,
            worker,
        })
    }

    pub fn paths(&self) -> &LedgerPaths {
        &self.paths
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn database(&self) -> &Arc<LiveDatabase> {
        &self.db
    }

    pub fn recovery(&self) -> Recovery {
        Recovery::new(
            Arc::clone(&self.db),
            RetryPolicy::from(&self.settings.recovery),
        )
    }

    pub fn ledger(&self) -> LedgerStore {
        LedgerStore::new(self.recovery())
    }

    /// Checkpoint and close the live handle and stop the remount worker
    pub async fn shutdown(self) {
        self.db.checkpoint_and_close().await;
        self.worker.abort();
        debug!("application context shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::DebtorDraft;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_creates_layout_and_serves_ledger() {
        let temp = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp.path().to_path_buf());
        let ctx = AppContext::open(paths.clone(), Settings::for_tests())
            .await
            .unwrap();

        assert!(paths.sqlite_dir().join("debitmanager").exists());
        assert!(paths.backup_dir().is_dir());

        let ledger = ctx.ledger();
        ledger.add_debtor(&DebtorDraft::new("Ann")).await.unwrap();
        assert_eq!(ledger.list_debtors().await.len(), 1);

        ctx.shutdown().await;
        assert!(!paths.sqlite_dir().join("debitmanager-wal").exists());
    }

    #[tokio::test]
    async fn test_lost_handle_is_remounted_by_worker() {
        let temp = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp.path().to_path_buf());
        let ctx = AppContext::open(paths, Settings::for_tests()).await.unwrap();
        let ledger = ctx.ledger();
        ledger.add_debtor(&DebtorDraft::new("Ann")).await.unwrap();

        ctx.database().close().await;

        assert_eq!(ledger.list_debtors().await.len(), 1);
        assert!(ctx.database().is_open().await);
    }
}
