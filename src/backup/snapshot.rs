//! Snapshot engine
//!
//! Produces point-in-time copies of the live database file under
//! `<base>/backups/`. Before copying, a secondary handle merges the write-ahead
//! log into the main file so the copy is self-contained; side-files are never
//! copied.
//!
//! When the secondary handle cannot be opened the copy still proceeds. Commits
//! still sitting in the log are then missing from the snapshot, which is
//! preferred over failing the backup outright.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::paths::LedgerPaths;
use crate::config::settings::Settings;
use crate::db::{best_effort, lifecycle, DatabaseLocation};
use crate::error::{LedgerError, LedgerResult};
use crate::storage::copy_verified;

/// Timestamp layout inside snapshot names; `:` and `.` replaced by `-`
const NAME_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S-%3fZ";

/// A local snapshot file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Parsed from the name
    pub created_at: DateTime<Utc>,
    pub modified_time: Option<DateTime<Utc>>,
}

/// Creates and lists local snapshots
#[derive(Debug)]
pub struct SnapshotEngine {
    location: DatabaseLocation,
    backup_dir: PathBuf,
    app_name: String,
    settle: Duration,
    last_issued: Mutex<Option<DateTime<Utc>>>,
}

impl SnapshotEngine {
    pub fn new(
        location: DatabaseLocation,
        backup_dir: PathBuf,
        app_name: impl Into<String>,
        settle: Duration,
    ) -> Self {
        Self {
            location,
            backup_dir,
            app_name: app_name.into(),
            settle,
            last_issued: Mutex::new(None),
        }
    }

    pub fn from_settings(paths: &LedgerPaths, settings: &Settings) -> Self {
        Self::new(
            DatabaseLocation::from_settings(paths, &settings.database),
            paths.backup_dir(),
            settings.database.app_name.clone(),
            settings.recovery.settle(),
        )
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn location(&self) -> &DatabaseLocation {
        &self.location
    }

    /// Locate the live database file
    pub async fn resolve_database_path(&self) -> LedgerResult<PathBuf> {
        self.location.resolve().await
    }

    /// Copy the live database into a new timestamped snapshot
    pub async fn create_snapshot(&self) -> LedgerResult<Snapshot> {
        let source = self.resolve_database_path().await?;
        debug!(source = %source.display(), "creating snapshot");

        let to_flush = source.clone();
        let flushed = tokio::task::spawn_blocking(move || flush_wal(&to_flush))
            .await
            .unwrap_or(false);
        if !flushed {
            debug!("snapshot proceeds without a checkpoint");
        }

        tokio::time::sleep(self.settle).await;

        tokio::fs::create_dir_all(&self.backup_dir).await?;
        let (name, created_at) = self.next_name().await;
        let dest = self.backup_dir.join(&name);

        let size_bytes = copy_verified(&source, &dest).await?;
        info!(snapshot = %name, bytes = size_bytes, "snapshot created");

        Ok(Snapshot {
            name,
            path: dest,
            size_bytes,
            created_at,
            modified_time: Some(Utc::now()),
        })
    }

    /// Pick a name strictly after every name issued so far and not on disk
    async fn next_name(&self) -> (String, DateTime<Utc>) {
        let mut at = Utc::now();
        if let Ok(last) = self.last_issued.lock() {
            if let Some(previous) = *last {
                if at <= previous {
                    at = previous + chrono::Duration::milliseconds(1);
                }
            }
        }

        loop {
            let name = self.snapshot_name(at);
            if tokio::fs::metadata(self.backup_dir.join(&name)).await.is_err() {
                if let Ok(mut last) = self.last_issued.lock() {
                    *last = Some(at);
                }
                return (name, at);
            }
            at += chrono::Duration::milliseconds(1);
        }
    }

    /// `<app>-<ISO-8601 with : and . replaced by ->.db`
    pub fn snapshot_name(&self, at: DateTime<Utc>) -> String {
        format!("{}-{}.db", self.app_name, at.format(NAME_TIME_FORMAT))
    }

    /// Recover the creation time from a snapshot name
    pub fn parse_snapshot_name(&self, name: &str) -> Option<DateTime<Utc>> {
        let stamp = name
            .strip_prefix(self.app_name.as_str())?
            .strip_prefix('-')?
            .strip_suffix(".db")?;
        let naive = NaiveDateTime::parse_from_str(stamp, NAME_TIME_FORMAT).ok()?;
        Some(Utc.from_utc_datetime(&naive))
    }

    /// Local snapshots, newest first
    pub async fn list_local_backups(&self) -> LedgerResult<Vec<Snapshot>> {
        let mut entries = match tokio::fs::read_dir(&self.backup_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(LedgerError::Io(format!(
                    "Failed to read backup directory: {}",
                    e
                )))
            }
        };

        let mut snapshots = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(created_at) = self.parse_snapshot_name(&name) else {
                continue;
            };
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            snapshots.push(Snapshot {
                path: entry.path(),
                size_bytes: meta.len(),
                created_at,
                modified_time: meta.modified().ok().map(DateTime::<Utc>::from),
                name,
            });
        }

        snapshots.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(snapshots)
    }
}

/// Checkpoint the file through a short-lived secondary handle
///
/// Returns whether the checkpoint ran. Opening never creates the file.
fn flush_wal(path: &Path) -> bool {
    let conn = match Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    ) {
        Ok(conn) => conn,
        Err(e) => {
            debug!(error = %e, "secondary handle unavailable; skipping checkpoint");
            return false;
        }
    };
    let ran = best_effort("snapshot checkpoint", lifecycle::checkpoint(&conn)).is_some();
    best_effort("close secondary handle", lifecycle::close(conn));
    ran
}
