//! Backup and restore for debit-manager
//!
//! # Architecture
//!
//! - [`SnapshotEngine`]: timestamped copies of the live database file
//! - [`MetadataStore`]: when the last backup succeeded
//! - [`BackupManager`]: snapshot, then cloud upload, generic upload or share
//! - [`RestoreManager`]: swaps the live file for the newest remote snapshot
//!   or a user-picked local one, then reloads the application
//! - [`BackupScheduler`]: periodic backups in the background
//!
//! # Snapshot naming
//!
//! Snapshots are named `<app>-<UTC timestamp>.db` with `:` and `.` replaced by
//! `-`, e.g. `debitmanager-2024-03-09T07-05-30-123Z.db`. Names sort in
//! creation order.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use debit_manager::cli::host::{PromptPicker, ReexecReloader};
//! use debit_manager::config::{paths::LedgerPaths, settings::Settings};
//! use debit_manager::services::{AppContext, BackupService, HostEnvironment};
//!
//! # async fn run() -> debit_manager::LedgerResult<()> {
//! let paths = LedgerPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let ctx = AppContext::open(paths, settings).await?;
//! let host = HostEnvironment {
//!     picker: Arc::new(PromptPicker::new(ctx.paths().backup_dir())),
//!     reloader: Arc::new(ReexecReloader),
//!     share: None,
//! };
//! let service = BackupService::new(&ctx, host)?;
//! let outcome = service.backup_now().await?;
//! println!("saved {}", outcome.path.display());
//! # Ok(())
//! # }
//! ```

mod manager;
mod metadata;
mod restore;
mod schedule;
mod share;
mod snapshot;
mod upload;

pub use manager::{BackupManager, BackupOutcome, BackupStage, RemoteTarget};
pub use metadata::MetadataStore;
pub use restore::{RestoreManager, RestoreOutcome, RestoreSource, RestoreStage, SNAPSHOT_EXTENSION};
pub use schedule::BackupScheduler;
pub use share::CommandShare;
pub use snapshot::{Snapshot, SnapshotEngine};
pub use upload::GenericUploader;
