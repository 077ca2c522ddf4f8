//! Restore state machine
//!
//! `Flushing → Closing → Clearing → Fetching → Installing → Reloading`.
//!
//! The suspension of the live handle is claimed before anything else, so a
//! second restore is refused and no consumer can reopen the file underneath
//! this one. The file gate is held until the new file is installed, which
//! keeps snapshots from copying a file that is being replaced. A copy of the current file is kept next to
//! the snapshots until the new file is installed; any failure before that puts
//! it back, resumes the handle and reports the error. Once installed, the
//! application is always reloaded.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info, warn};

use super::manager::RemoteTarget;
use crate::db::{best_effort, side_files, LiveDatabase};
use crate::error::{ErrorKind, LedgerError, LedgerResult};
use crate::host::{FilePicker, Reloader};
use crate::remote::{sort_newest_first, RemoteFile};
use crate::storage::{copy_verified, remove_if_exists};

/// Extension a picked snapshot must carry
pub const SNAPSHOT_EXTENSION: &str = "db";

const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";
const ROLLBACK_NAME: &str = "pre-restore.db.bak";
const DOWNLOAD_NAME: &str = "restore-download.partial";

/// Where a restore currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStage {
    Flushing,
    Closing,
    Clearing,
    Fetching,
    Installing,
    Reloading,
}

impl fmt::Display for RestoreStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Flushing => "flushing",
            Self::Closing => "closing",
            Self::Clearing => "clearing",
            Self::Fetching => "fetching",
            Self::Installing => "installing",
            Self::Reloading => "reloading",
        };
        f.write_str(name)
    }
}

/// Which snapshot was installed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RestoreSource {
    Remote(RemoteFile),
    Local { path: PathBuf },
}

impl fmt::Display for RestoreSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(file) => write!(f, "cloud snapshot {}", file.name),
            Self::Local { path } => write!(f, "local file {}", path.display()),
        }
    }
}

/// Result of a completed restore
#[derive(Debug, Clone, Serialize)]
pub struct RestoreOutcome {
    pub source: RestoreSource,
    /// Every path the snapshot was written to
    pub installed: Vec<PathBuf>,
    /// False when the reload failed and the user must restart by hand
    pub reloaded: bool,
}

/// A fetched snapshot waiting to be installed
struct Fetched {
    source: RestoreSource,
    file: PathBuf,
    staged: bool,
}

/// Replaces the live database with a snapshot
pub struct RestoreManager {
    db: Arc<LiveDatabase>,
    remote: Option<RemoteTarget>,
    picker: Arc<dyn FilePicker>,
    reloader: Arc<dyn Reloader>,
    staging_dir: PathBuf,
    settle: Duration,
}

impl RestoreManager {
    /// `staging_dir` holds the rollback copy and remote downloads; it must not
    /// be the database directory
    pub fn new(
        db: Arc<LiveDatabase>,
        picker: Arc<dyn FilePicker>,
        reloader: Arc<dyn Reloader>,
        staging_dir: PathBuf,
        settle: Duration,
    ) -> Self {
        Self {
            db,
            remote: None,
            picker,
            reloader,
            staging_dir,
            settle,
        }
    }

    pub fn with_remote(mut self, remote: RemoteTarget) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Restore the newest remote snapshot, or a user-picked local one
    pub async fn restore_latest(&self) -> LedgerResult<RestoreOutcome> {
        self.restore(None).await
    }

    /// Restore this local snapshot; cloud storage and the picker are skipped
    pub async fn restore_from(&self, path: &Path) -> LedgerResult<RestoreOutcome> {
        self.restore(Some(path)).await
    }

    async fn restore(&self, chosen: Option<&Path>) -> LedgerResult<RestoreOutcome> {
        if !self.db.try_suspend() {
            return Err(LedgerError::RestoreInProgress);
        }
        let gate = self.db.lock_file().await;

        let target = match self.db.current_path().await {
            Some(path) => path,
            None => self.db.location().resolve_or_canonical().await,
        };
        let alternate = self.db.location().alternate_of(&target);
        info!(target = %target.display(), "restore started");

        debug!(stage = %RestoreStage::Flushing, "restore stage");
        best_effort("checkpoint before restore", self.db.checkpoint().await);

        debug!(stage = %RestoreStage::Closing, "restore stage");
        self.db.close().await;
        tokio::time::sleep(self.settle).await;

        let rollback = match self.keep_rollback(&target).await {
            Ok(rollback) => rollback,
            Err(e) => {
                let err = self.abort(RestoreStage::Closing, e, &target, None).await;
                drop(gate);
                return Err(err);
            }
        };

        let (source, installed) = match self.replace(&target, &alternate, chosen).await {
            Ok(done) => done,
            Err((stage, e)) => {
                let err = self.abort(stage, e, &target, rollback.as_deref()).await;
                drop(gate);
                return Err(err);
            }
        };
        if let Some(rollback) = &rollback {
            best_effort("remove rollback copy", remove_if_exists(rollback).await);
        }
        drop(gate);
        info!(%source, "snapshot installed");

        debug!(stage = %RestoreStage::Reloading, "restore stage");
        let reloaded = match self.reloader.reload().await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "reload after restore failed; restart the application manually");
                false
            }
        };

        Ok(RestoreOutcome {
            source,
            installed,
            reloaded,
        })
    }

    /// Clearing, Fetching and Installing
    async fn replace(
        &self,
        target: &Path,
        alternate: &Path,
        chosen: Option<&Path>,
    ) -> Result<(RestoreSource, Vec<PathBuf>), (RestoreStage, LedgerError)> {
        debug!(stage = %RestoreStage::Clearing, "restore stage");
        clear(&[target, alternate])
            .await
            .map_err(|e| (RestoreStage::Clearing, e))?;

        debug!(stage = %RestoreStage::Fetching, "restore stage");
        let fetched = match chosen {
            Some(path) => local_snapshot(path.to_path_buf()).await,
            None => self.fetch().await,
        }
        .map_err(|e| (RestoreStage::Fetching, e))?;

        debug!(stage = %RestoreStage::Installing, "restore stage");
        let installed = install(&fetched.file, &[target, alternate]).await;
        if fetched.staged {
            best_effort("remove downloaded snapshot", remove_if_exists(&fetched.file).await);
        }
        let installed = installed.map_err(|e| (RestoreStage::Installing, e))?;
        Ok((fetched.source, installed))
    }

    async fn keep_rollback(&self, target: &Path) -> LedgerResult<Option<PathBuf>> {
        if tokio::fs::metadata(target).await.is_err() {
            return Ok(None);
        }
        tokio::fs::create_dir_all(&self.staging_dir).await?;
        let rollback = self.staging_dir.join(ROLLBACK_NAME);
        copy_verified(target, &rollback).await?;
        Ok(Some(rollback))
    }

    async fn fetch(&self) -> LedgerResult<Fetched> {
        if let Some(remote) = &self.remote {
            if remote.store.is_signed_in().await {
                match self.fetch_remote(remote).await {
                    Ok(Some(fetched)) => return Ok(fetched),
                    Ok(None) => info!("no cloud snapshots; asking for a local file"),
                    Err(e) if e.kind() == ErrorKind::Network => {
                        warn!(error = %e, "cloud storage unreachable; asking for a local file");
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        let picked = self
            .picker
            .pick_snapshot(SNAPSHOT_EXTENSION)
            .await?
            .ok_or_else(|| LedgerError::Cancelled("no snapshot selected".into()))?;
        local_snapshot(picked).await
    }

    async fn fetch_remote(&self, remote: &RemoteTarget) -> LedgerResult<Option<Fetched>> {
        let folder = remote.store.get_or_create_folder(&remote.folder_name).await?;
        let mut files = remote.store.list(&folder).await?;
        sort_newest_first(&mut files);
        let Some(newest) = files.into_iter().next() else {
            return Ok(None);
        };

        tokio::fs::create_dir_all(&self.staging_dir).await?;
        let dest = self.staging_dir.join(DOWNLOAD_NAME);
        remote.store.download(&newest.id, &dest).await?;
        debug!(file = %newest.name, "downloaded cloud snapshot");

        Ok(Some(Fetched {
            source: RestoreSource::Remote(newest),
            file: dest,
            staged: true,
        }))
    }

    /// Put the previous file back, release the handle and hand back the error
    async fn abort(
        &self,
        stage: RestoreStage,
        err: LedgerError,
        target: &Path,
        rollback: Option<&Path>,
    ) -> LedgerError {
        error!(%stage, error = %err, "restore aborted");

        if let Some(rollback) = rollback {
            let alternate = self.db.location().alternate_of(target);
            if clear(&[target, alternate.as_path()]).await.is_ok() {
                best_effort(
                    "reinstate previous database",
                    copy_verified(rollback, target).await,
                );
            }
            best_effort("remove rollback copy", remove_if_exists(rollback).await);
        }

        self.db.resume();
        best_effort("reopen after aborted restore", self.db.reopen().await);
        err
    }
}

/// Check a local file is a `.db` snapshot that exists
async fn local_snapshot(picked: PathBuf) -> LedgerResult<Fetched> {
    if picked.extension().map_or(true, |ext| ext != SNAPSHOT_EXTENSION) {
        return Err(LedgerError::Validation(format!(
            "{} is not a .{} snapshot",
            picked.display(),
            SNAPSHOT_EXTENSION
        )));
    }
    if tokio::fs::metadata(&picked).await.is_err() {
        return Err(LedgerError::snapshot_not_found(picked.display().to_string()));
    }

    Ok(Fetched {
        source: RestoreSource::Local {
            path: picked.clone(),
        },
        file: picked,
        staged: false,
    })
}

/// Delete the files and their side-files; missing files are fine
async fn clear(paths: &[&Path]) -> LedgerResult<()> {
    for path in paths {
        remove_if_exists(path).await?;
        for side in side_files(path) {
            remove_if_exists(&side).await?;
        }
    }
    Ok(())
}

/// Copy `source` to every destination after checking it is a SQLite file
async fn install(source: &Path, dests: &[&Path]) -> LedgerResult<Vec<PathBuf>> {
    check_sqlite_header(source).await?;
    let mut installed = Vec::with_capacity(dests.len());
    for dest in dests {
        copy_verified(source, dest).await?;
        for side in side_files(dest) {
            remove_if_exists(&side).await?;
        }
        installed.push(dest.to_path_buf());
    }
    Ok(installed)
}

async fn check_sqlite_header(path: &Path) -> LedgerResult<()> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut header = [0u8; 16];
    match file.read_exact(&mut header).await {
        Ok(_) if &header == SQLITE_HEADER => Ok(()),
        _ => Err(LedgerError::Integrity(format!(
            "{} is not a SQLite database",
            path.display()
        ))),
    }
}
