//! Backup service
//!
//! The operations a front end calls: back up now, restore the latest
//! snapshot, list local and remote snapshots and read the last backup time.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::context::AppContext;
use crate::backup::{
    BackupManager, BackupOutcome, BackupScheduler, CommandShare, GenericUploader, MetadataStore,
    RemoteTarget, RestoreManager, RestoreOutcome, Snapshot, SnapshotEngine,
};
use crate::error::{LedgerError, LedgerResult};
use crate::host::{FilePicker, Reloader, SharePort};
use crate::remote::{DriveClient, RemoteFile};

/// Host collaborators the backup and restore flows need
#[derive(Clone)]
pub struct HostEnvironment {
    pub picker: Arc<dyn FilePicker>,
    pub reloader: Arc<dyn Reloader>,
    /// Defaults to [`CommandShare`] driven by the share settings
    pub share: Option<Arc<dyn SharePort>>,
}

/// Service for backup and restore
pub struct BackupService {
    backups: Arc<BackupManager>,
    restore: RestoreManager,
    drive: Option<Arc<DriveClient>>,
}

impl BackupService {
    /// Wire the backup and restore orchestrators to the live database
    pub fn new(ctx: &AppContext, host: HostEnvironment) -> LedgerResult<Self> {
        let paths = ctx.paths();
        let settings = ctx.settings();

        let drive = if settings.remote.enabled {
            Some(Arc::new(DriveClient::from_settings(paths, &settings.remote)?))
        } else {
            None
        };
        let remote = drive.as_ref().map(|drive| RemoteTarget {
            store: drive.clone(),
            folder_name: settings.remote.folder_name.clone(),
        });

        let http = reqwest::Client::builder()
            .user_agent(format!("debitmanager/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LedgerError::Config(format!("Failed to create HTTP client: {}", e)))?;
        let share = host
            .share
            .unwrap_or_else(|| Arc::new(CommandShare::new(settings.share.clone())));

        let mut backups = BackupManager::new(
            SnapshotEngine::from_settings(paths, settings),
            MetadataStore::new(paths.metadata_file()),
            GenericUploader::new(http, settings.upload.clone()),
            share,
            settings.backup_retention.clone(),
        )
        .with_live_database(Arc::clone(ctx.database()));

        let mut restore = RestoreManager::new(
            Arc::clone(ctx.database()),
            host.picker,
            host.reloader,
            paths.backup_dir(),
            settings.recovery.settle(),
        );

        if let Some(remote) = remote {
            backups = backups.with_remote(remote.clone());
            restore = restore.with_remote(remote);
        }

        Ok(Self {
            backups: Arc::new(backups),
            restore,
            drive,
        })
    }

    pub async fn backup_now(&self) -> LedgerResult<BackupOutcome> {
        self.backups.backup_now().await
    }

    pub async fn restore_latest(&self) -> LedgerResult<RestoreOutcome> {
        self.restore.restore_latest().await
    }

    /// Restore a specific local snapshot, even when signed in
    pub async fn restore_from(&self, path: &Path) -> LedgerResult<RestoreOutcome> {
        self.restore.restore_from(path).await
    }

    pub async fn list_local_backups(&self) -> LedgerResult<Vec<Snapshot>> {
        self.backups.list_local_backups().await
    }

    pub async fn list_remote_backups(&self) -> LedgerResult<Vec<RemoteFile>> {
        self.backups.list_remote_backups().await
    }

    pub async fn delete_remote_backup(&self, file_id: &str) -> LedgerResult<()> {
        self.backups.delete_remote_backup(file_id).await
    }

    pub fn get_last_backup_time(&self) -> Option<DateTime<Utc>> {
        self.backups.get_last_backup_time()
    }

    pub async fn prune_candidates(&self) -> LedgerResult<Vec<Snapshot>> {
        self.backups.prune_candidates().await
    }

    pub async fn prune(&self) -> LedgerResult<Vec<Snapshot>> {
        self.backups.prune().await
    }

    /// Start periodic backups every `period`
    pub fn start_schedule(&self, period: Duration) -> BackupScheduler {
        BackupScheduler::start(Arc::clone(&self.backups), period)
    }

    /// The cloud client, when the remote destination is enabled
    pub fn drive(&self) -> Option<&DriveClient> {
        self.drive.as_deref()
    }
}
