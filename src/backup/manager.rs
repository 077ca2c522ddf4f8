//! Backup orchestrator
//!
//! `Idle → Snapshotting → {UploadingRemote | UploadingGeneric | Sharing |
//! LocalOnly} → Done`. The snapshot is the only step whose failure ends the
//! run; every destination after it falls through to the next one.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::metadata::MetadataStore;
use super::snapshot::{Snapshot, SnapshotEngine};
use super::upload::GenericUploader;
use crate::config::settings::BackupRetention;
use crate::db::{best_effort, LiveDatabase};
use crate::error::{LedgerError, LedgerResult};
use crate::host::SharePort;
use crate::remote::{sort_newest_first, RemoteFile, RemoteStore};
use crate::storage::remove_if_exists;

/// Where a backup run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupStage {
    Snapshotting,
    UploadingRemote,
    UploadingGeneric,
    Sharing,
    LocalOnly,
    Done,
}

impl fmt::Display for BackupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Snapshotting => "snapshotting",
            Self::UploadingRemote => "uploading to cloud storage",
            Self::UploadingGeneric => "uploading to endpoint",
            Self::Sharing => "sharing",
            Self::LocalOnly => "local only",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Result of a backup run
#[derive(Debug, Clone, Serialize)]
pub struct BackupOutcome {
    pub path: PathBuf,
    pub snapshot: Snapshot,
    pub uploaded_remote: bool,
    pub uploaded_generic: bool,
    pub shared: bool,
    pub remote_file: Option<RemoteFile>,
    /// Why the cloud upload was skipped over, for showing to the user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_error: Option<String>,
}

/// Remote destination and the folder snapshots go into
#[derive(Clone)]
pub struct RemoteTarget {
    pub store: Arc<dyn RemoteStore>,
    pub folder_name: String,
}

/// Creates snapshots and distributes them to the configured destinations
pub struct BackupManager {
    db: Option<Arc<LiveDatabase>>,
    snapshots: SnapshotEngine,
    metadata: MetadataStore,
    remote: Option<RemoteTarget>,
    uploader: GenericUploader,
    share: Arc<dyn SharePort>,
    retention: BackupRetention,
}

impl BackupManager {
    pub fn new(
        snapshots: SnapshotEngine,
        metadata: MetadataStore,
        uploader: GenericUploader,
        share: Arc<dyn SharePort>,
        retention: BackupRetention,
    ) -> Self {
        Self {
            db: None,
            snapshots,
            metadata,
            remote: None,
            uploader,
            share,
            retention,
        }
    }

    /// Checkpoint this live handle before each snapshot
    pub fn with_live_database(mut self, db: Arc<LiveDatabase>) -> Self {
        self.db = Some(db);
        self
    }

    pub fn with_remote(mut self, remote: RemoteTarget) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn snapshots(&self) -> &SnapshotEngine {
        &self.snapshots
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    async fn signed_in_remote(&self) -> Option<&RemoteTarget> {
        match &self.remote {
            Some(remote) if remote.store.is_signed_in().await => Some(remote),
            _ => None,
        }
    }

    fn record_success(&self, stage: BackupStage) {
        best_effort(
            "record last backup",
            self.metadata.set_last_backup_timestamp(Utc::now()),
        );
        debug!(%stage, "last backup recorded");
    }

    /// Snapshot the live database and send it to the first destination that
    /// accepts it
    ///
    /// Refused with [`LedgerError::RestoreInProgress`] while a restore holds
    /// the live handle.
    pub async fn backup_now(&self) -> LedgerResult<BackupOutcome> {
        debug!(stage = %BackupStage::Snapshotting, "backup started");
        let gate = match &self.db {
            Some(db) => {
                let gate = db.lock_file().await;
                if db.is_suspended() {
                    warn!("backup refused; a restore owns the database");
                    return Err(LedgerError::RestoreInProgress);
                }
                best_effort("checkpoint live handle", db.checkpoint().await);
                Some(gate)
            }
            None => None,
        };
        let snapshot = self.snapshots.create_snapshot().await;
        drop(gate);
        let snapshot = snapshot?;

        let mut outcome = BackupOutcome {
            path: snapshot.path.clone(),
            snapshot,
            uploaded_remote: false,
            uploaded_generic: false,
            shared: false,
            remote_file: None,
            remote_error: None,
        };

        if let Some(remote) = self.signed_in_remote().await {
            debug!(stage = %BackupStage::UploadingRemote, "backup stage");
            let uploaded = async {
                let folder = remote.store.get_or_create_folder(&remote.folder_name).await?;
                remote.store.upload(&outcome.path, &folder).await
            }
            .await;
            match uploaded {
                Ok(file) => {
                    outcome.uploaded_remote = true;
                    outcome.remote_file = Some(file);
                    self.record_success(BackupStage::UploadingRemote);
                    info!(stage = %BackupStage::Done, path = %outcome.path.display(), "backup uploaded to cloud storage");
                    return Ok(outcome);
                }
                Err(e) => {
                    warn!(error = %e, "cloud upload failed; trying next destination");
                    outcome.remote_error = Some(e.user_message());
                }
            }
        }

        if self.uploader.is_configured() {
            debug!(stage = %BackupStage::UploadingGeneric, "backup stage");
            match self.uploader.upload(&outcome.path).await {
                Ok(true) => {
                    outcome.uploaded_generic = true;
                    self.record_success(BackupStage::UploadingGeneric);
                    info!(stage = %BackupStage::Done, path = %outcome.path.display(), "backup uploaded to endpoint");
                    return Ok(outcome);
                }
                Ok(false) => {}
                Err(e) => warn!(error = %e, "generic upload failed; falling back to share"),
            }
        }

        debug!(stage = %BackupStage::Sharing, "backup stage");
        outcome.shared = best_effort("share snapshot", self.share.share(&outcome.path).await)
            .unwrap_or(false);

        // A local snapshot counts as a backup whether or not sharing went
        // anywhere.
        self.record_success(if outcome.shared {
            BackupStage::Sharing
        } else {
            BackupStage::LocalOnly
        });
        info!(stage = %BackupStage::Done, path = %outcome.path.display(), shared = outcome.shared, "backup saved locally");
        Ok(outcome)
    }

    pub fn get_last_backup_time(&self) -> Option<DateTime<Utc>> {
        self.metadata.get_last_backup_timestamp()
    }

    pub async fn list_local_backups(&self) -> LedgerResult<Vec<Snapshot>> {
        self.snapshots.list_local_backups().await
    }

    /// Remote snapshots newest first; empty when not signed in
    pub async fn list_remote_backups(&self) -> LedgerResult<Vec<RemoteFile>> {
        let Some(remote) = self.signed_in_remote().await else {
            return Ok(Vec::new());
        };
        let folder = remote.store.get_or_create_folder(&remote.folder_name).await?;
        let mut files = remote.store.list(&folder).await?;
        sort_newest_first(&mut files);
        Ok(files)
    }

    /// Delete one remote snapshot
    pub async fn delete_remote_backup(&self, file_id: &str) -> LedgerResult<()> {
        match &self.remote {
            Some(remote) => remote.store.delete(file_id).await,
            None => Ok(()),
        }
    }

    /// Local snapshots that [`prune`](Self::prune) would delete
    ///
    /// The newest snapshot is always kept.
    pub async fn prune_candidates(&self) -> LedgerResult<Vec<Snapshot>> {
        let keep = self.retention.keep_count.max(1) as usize;
        let snapshots = self.list_local_backups().await?;
        Ok(snapshots.into_iter().skip(keep).collect())
    }

    /// Delete local snapshots beyond the retention count
    pub async fn prune(&self) -> LedgerResult<Vec<Snapshot>> {
        let candidates = self.prune_candidates().await?;
        let mut deleted = Vec::with_capacity(candidates.len());
        for snapshot in candidates {
            remove_if_exists(&snapshot.path).await?;
            deleted.push(snapshot);
        }
        if !deleted.is_empty() {
            info!(count = deleted.len(), "pruned old snapshots");
        }
        Ok(deleted)
    }
}
