//! Database Handle Manager
//!
//! Owns the single live SQLite handle and its lifecycle:
//!
//! - [`LiveDatabase`]: open / close / reopen, checkpoint, and the suspension
//!   used by restore as its exclusion point
//! - [`RemountCoordinator`]: the request/broadcast protocol consumers use to
//!   ask for a fresh handle
//! - [`spawn_remount_worker`]: the hosting-environment side of that protocol
//! - [`DatabaseLocation`]: canonical resolution of the file on disk
//!
//! At most one handle holds the file open; it must be fully closed before the
//! file or its side-files are copied, deleted or overwritten.

pub mod lifecycle;
pub mod location;
pub mod migrations;
pub mod remount;

pub use lifecycle::{best_effort, checkpoint_and_close};
pub use location::{side_files, DatabaseLocation};
pub use remount::{RemountCoordinator, RemountRequest, RemountTimings};

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{LedgerError, LedgerResult};

struct OpenHandle {
    conn: Connection,
    path: PathBuf,
}

/// Light health check of the live handle
#[derive(Debug, Clone)]
pub struct DbStatus {
    pub path: PathBuf,
    pub user_version: i64,
    pub journal_mode: String,
}

/// The single live database handle
pub struct LiveDatabase {
    location: DatabaseLocation,
    handle: Mutex<Option<OpenHandle>>,
    suspended: AtomicBool,
    file_gate: Mutex<()>,
    coordinator: Arc<RemountCoordinator>,
}

impl LiveDatabase {
    /// Open the live database, creating and migrating it if needed
    pub async fn open(
        location: DatabaseLocation,
        coordinator: Arc<RemountCoordinator>,
    ) -> LedgerResult<Arc<Self>> {
        let db = Arc::new(Self {
            location,
            handle: Mutex::new(None),
            suspended: AtomicBool::new(false),
            file_gate: Mutex::new(()),
            coordinator,
        });
        db.open_handle().await?;
        Ok(db)
    }

    async fn open_handle(&self) -> LedgerResult<()> {
        tokio::fs::create_dir_all(self.location.dir()).await?;
        let path = self.location.resolve_or_canonical().await;

        let conn = Connection::open(&path)?;
        migrations::migrate(&conn)?;

        let mut slot = self.handle.lock().await;
        if let Some(stale) = slot.take() {
            best_effort("close stale handle", lifecycle::close(stale.conn));
        }
        *slot = Some(OpenHandle {
            conn,
            path: path.clone(),
        });
        drop(slot);

        self.coordinator.handle_opened();
        info!(path = %path.display(), "live database handle opened");
        Ok(())
    }

    /// Close the current handle (if any) and open a fresh one
    ///
    /// Refused while a restore holds the handle suspended.
    pub async fn reopen(&self) -> LedgerResult<()> {
        if self.is_suspended() {
            return Err(LedgerError::RestoreInProgress);
        }
        self.close().await;
        self.open_handle().await
    }

    /// Close the live handle; best-effort and idempotent
    pub async fn close(&self) {
        let handle = self.handle.lock().await.take();
        if let Some(handle) = handle {
            best_effort("close live handle", lifecycle::close(handle.conn));
            self.coordinator.handle_closed();
            info!(path = %handle.path.display(), "live database handle closed");
        }
    }

    /// Checkpoint then close the live handle; both steps best-effort
    pub async fn checkpoint_and_close(&self) {
        let handle = self.handle.lock().await.take();
        if let Some(handle) = handle {
            checkpoint_and_close(handle.conn);
            self.coordinator.handle_closed();
            info!(path = %handle.path.display(), "live database handle checkpointed and closed");
        }
    }

    /// Issue a TRUNCATE checkpoint on the live handle
    pub async fn checkpoint(&self) -> LedgerResult<()> {
        let guard = self.handle.lock().await;
        match guard.as_ref() {
            Some(handle) => lifecycle::checkpoint(&handle.conn),
            None => Err(LedgerError::TransientHandle(
                "live handle is closed".into(),
            )),
        }
    }

    /// Run `op` against the live connection
    ///
    /// A missing handle is reported as a transient failure so the retry layer
    /// can ask for a remount; a suspended handle is not retried.
    pub async fn with_conn<T, F>(&self, op: F) -> LedgerResult<T>
    where
        F: FnOnce(&mut Connection) -> LedgerResult<T>,
    {
        if self.is_suspended() {
            return Err(LedgerError::RestoreInProgress);
        }
        let mut guard = self.handle.lock().await;
        match guard.as_mut() {
            Some(handle) => op(&mut handle.conn),
            None => Err(LedgerError::TransientHandle(
                "live handle is closed".into(),
            )),
        }
    }

    /// Hold the handle exclusively for a restore; `false` if one already does
    pub fn try_suspend(&self) -> bool {
        let claimed = !self.suspended.swap(true, Ordering::SeqCst);
        if claimed {
            debug!("live handle suspended");
        }
        claimed
    }

    /// Exclusive access to the database file on disk
    ///
    /// Snapshots hold it while copying and restore holds it while replacing,
    /// so neither sees the file half-written by the other.
    pub async fn lock_file(&self) -> MutexGuard<'_, ()> {
        self.file_gate.lock().await
    }

    /// Release a suspension after an aborted restore
    pub fn resume(&self) {
        self.suspended.store(false, Ordering::SeqCst);
        debug!("live handle resumed");
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst)
    }

    pub async fn is_open(&self) -> bool {
        self.handle.lock().await.is_some()
    }

    /// Path of the currently open file
    pub async fn current_path(&self) -> Option<PathBuf> {
        self.handle.lock().await.as_ref().map(|h| h.path.clone())
    }

    pub fn location(&self) -> &DatabaseLocation {
        &self.location
    }

    pub fn coordinator(&self) -> &Arc<RemountCoordinator> {
        &self.coordinator
    }

    /// user_version and journal_mode of the live handle
    pub async fn status(&self) -> LedgerResult<DbStatus> {
        let guard = self.handle.lock().await;
        let handle = guard
            .as_ref()
            .ok_or_else(|| LedgerError::TransientHandle("live handle is closed".into()))?;
        let user_version = migrations::user_version(&handle.conn)?;
        let journal_mode: String =
            handle
                .conn
                .query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        Ok(DbStatus {
            path: handle.path.clone(),
            user_version,
            journal_mode,
        })
    }
}

/// Serve remount requests by recreating the live handle
///
/// This is the hosting environment's handler: it registers with the
/// coordinator (replacing any earlier handler), reopens the handle for every
/// request and reports readiness.
pub fn spawn_remount_worker(db: Arc<LiveDatabase>) -> JoinHandle<()> {
    let coordinator = Arc::clone(db.coordinator());
    let mut requests = coordinator.register_handler();
    tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            info!(request = request.id, "remounting live database handle");
            let ok = match db.reopen().await {
                Ok(()) => true,
                Err(e) => {
                    warn!(request = request.id, error = %e, "remount failed");
                    false
                }
            };
            coordinator.notify_ready(ok).await;
        }
        debug!("remount handler replaced; worker exiting");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::Settings;
    use tempfile::TempDir;

    fn location(temp: &TempDir) -> DatabaseLocation {
        DatabaseLocation::new(
            temp.path().join("SQLite"),
            vec!["debitmanager".into(), "debitmanager.db".into()],
        )
    }

    fn coordinator() -> Arc<RemountCoordinator> {
        Arc::new(RemountCoordinator::new(RemountTimings::from(
            &Settings::for_tests().recovery,
        )))
    }

    #[tokio::test]
    async fn test_open_creates_canonical_file() {
        let temp = TempDir::new().unwrap();
        let coordinator = coordinator();
        let db = LiveDatabase::open(location(&temp), Arc::clone(&coordinator))
            .await
            .unwrap();

        assert!(temp.path().join("SQLite").join("debitmanager").exists());
        assert!(coordinator.is_handle_open());

        let status = db.status().await.unwrap();
        assert_eq!(status.user_version, migrations::DATABASE_VERSION);
        assert_eq!(status.journal_mode, "wal");
    }

    #[tokio::test]
    async fn test_closed_handle_is_transient() {
        let temp = TempDir::new().unwrap();
        let db = LiveDatabase::open(location(&temp), coordinator())
            .await
            .unwrap();

        db.close().await;
        db.close().await;

        let err = db.with_conn(|_| Ok(())).await.unwrap_err();
        assert!(err.is_transient());
        assert!(!db.coordinator().is_handle_open());
    }

    #[tokio::test]
    async fn test_suspended_handle_refuses_use_and_reopen() {
        let temp = TempDir::new().unwrap();
        let db = LiveDatabase::open(location(&temp), coordinator())
            .await
            .unwrap();

        assert!(db.try_suspend());
        let err = db.with_conn(|_| Ok(())).await.unwrap_err();
        assert!(matches!(err, LedgerError::RestoreInProgress));
        assert!(!err.is_transient());
        assert!(matches!(
            db.reopen().await,
            Err(LedgerError::RestoreInProgress)
        ));

        db.resume();
        db.with_conn(|_| Ok(())).await.unwrap();
    }

    #[tokio::test]
    async fn test_try_suspend_claims_once() {
        let temp = TempDir::new().unwrap();
        let db = LiveDatabase::open(location(&temp), coordinator())
            .await
            .unwrap();

        assert!(db.try_suspend());
        assert!(!db.try_suspend());
        assert!(db.is_suspended());

        db.resume();
        assert!(db.try_suspend());
    }

    #[tokio::test]
    async fn test_remount_worker_reopens_closed_handle() {
        let temp = TempDir::new().unwrap();
        let db = LiveDatabase::open(location(&temp), coordinator())
            .await
            .unwrap();
        spawn_remount_worker(Arc::clone(&db));

        db.close().await;
        assert!(!db.is_open().await);

        assert!(db.coordinator().request_remount().await);
        assert!(db.is_open().await);
        db.with_conn(|conn| {
            conn.execute("INSERT INTO debtors (name) VALUES ('Ann')", [])?;
            Ok(())
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_checkpoint_and_close_leaves_no_wal_content() {
        let temp = TempDir::new().unwrap();
        let db = LiveDatabase::open(location(&temp), coordinator())
            .await
            .unwrap();
        db.with_conn(|conn| {
            conn.execute("INSERT INTO debtors (name) VALUES ('Ann')", [])?;
            Ok(())
        })
        .await
        .unwrap();
        let path = db.current_path().await.unwrap();

        db.checkpoint_and_close().await;

        let [wal, _] = side_files(&path);
        let wal_len = std::fs::metadata(&wal).map(|m| m.len()).unwrap_or(0);
        assert_eq!(wal_len, 0);
        assert!(!db.is_open().await);
    }
}
