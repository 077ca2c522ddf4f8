//! Backup and restore CLI commands

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Subcommand;

use super::host::{PromptPicker, ReexecReloader};
use crate::backup::RestoreSource;
use crate::display::{format_duration, format_remote_list, format_size, format_snapshot_list};
use crate::error::LedgerResult;
use crate::services::{AppContext, BackupService, HostEnvironment};

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Snapshot the database and send it to the configured destination
    Create,

    /// List local snapshots
    List {
        /// Show detailed information
        #[arg(short, long)]
        verbose: bool,
    },

    /// List snapshots in cloud storage
    Remote,

    /// Show when the last successful backup ran
    Last,

    /// Delete local snapshots beyond the retention count
    Prune {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Back up periodically until interrupted
    Schedule {
        /// Minutes between backups (defaults to the configured interval)
        #[arg(short, long)]
        interval: Option<u64>,
    },
}

fn service(ctx: &AppContext) -> LedgerResult<BackupService> {
    BackupService::new(
        ctx,
        HostEnvironment {
            picker: Arc::new(PromptPicker::new(ctx.paths().backup_dir())),
            reloader: Arc::new(ReexecReloader),
            share: None,
        },
    )
}

/// Handle a backup command
pub async fn handle_backup_command(ctx: &AppContext, cmd: BackupCommands) -> LedgerResult<()> {
    let service = service(ctx)?;

    match cmd {
        BackupCommands::Create => {
            println!("Creating backup...");
            let outcome = service.backup_now().await?;
            println!("Snapshot: {}", outcome.snapshot.name);
            println!("Size:     {}", format_size(outcome.snapshot.size_bytes));
            let destination = if outcome.uploaded_remote {
                "cloud storage"
            } else if outcome.uploaded_generic {
                "upload endpoint"
            } else if outcome.shared {
                "shared"
            } else {
                "local only"
            };
            println!("Saved to: {}", destination);
            if let Some(reason) = &outcome.remote_error {
                println!("Cloud upload skipped: {}", reason);
            }
            println!("Location: {}", outcome.path.display());
        }

        BackupCommands::List { verbose } => {
            let snapshots = service.list_local_backups().await?;
            if snapshots.is_empty() {
                println!("No backups found.");
                println!("Create one with: debitmanager backup create");
                return Ok(());
            }

            println!("Local Backups");
            println!("=============");
            println!();
            print!("{}", format_snapshot_list(&snapshots, chrono::Utc::now(), verbose));
            println!();
            println!("Total: {} backup(s)", snapshots.len());
        }

        BackupCommands::Remote => {
            let drive_signed_in = service
                .drive()
                .is_some_and(|drive| drive.authenticator().is_signed_in());
            if !drive_signed_in {
                println!("Not signed in to cloud storage.");
                println!("Sign in with: debitmanager auth login");
                return Ok(());
            }

            let files = service.list_remote_backups().await?;
            if files.is_empty() {
                println!("No cloud backups found.");
                return Ok(());
            }
            println!("Cloud Backups");
            println!("=============");
            print!("{}", format_remote_list(&files));
            println!();
            println!("Total: {} backup(s)", files.len());
        }

        BackupCommands::Last => match service.get_last_backup_time() {
            Some(at) => {
                let age = format_duration(chrono::Utc::now().signed_duration_since(at));
                println!(
                    "Last backup: {} ({} ago)",
                    at.format("%Y-%m-%d %H:%M:%S UTC"),
                    age
                );
            }
            None => println!("No backup has been made yet."),
        },

        BackupCommands::Prune { force } => {
            let candidates = service.prune_candidates().await?;
            let keep = ctx.settings().backup_retention.keep_count;
            if candidates.is_empty() {
                println!("No backups to prune.");
                println!("Current retention policy: keep {} newest", keep);
                return Ok(());
            }

            println!("Prune Summary");
            println!("=============");
            println!("Retention policy: keep {} newest", keep);
            println!("To be deleted: {}", candidates.len());
            for snapshot in &candidates {
                println!("  {}", snapshot.name);
            }
            println!();

            if !force {
                println!("To delete old backups, run again with --force flag:");
                println!("  debitmanager backup prune --force");
                return Ok(());
            }

            let deleted = service.prune().await?;
            println!("Deleted {} backup(s).", deleted.len());
        }

        BackupCommands::Schedule { interval } => {
            let minutes = interval
                .unwrap_or(ctx.settings().schedule.interval_minutes)
                .max(1);
            println!(
                "Backing up every {} minute(s). Press Ctrl-C to stop.",
                minutes
            );
            let scheduler = service.start_schedule(Duration::from_secs(minutes * 60));
            tokio::signal::ctrl_c().await?;
            let runs = scheduler.stop().await;
            println!("Stopped after {} scheduled backup(s).", runs);
        }
    }

    Ok(())
}

/// Replace the live database with the newest snapshot
pub async fn handle_restore_command(
    ctx: &AppContext,
    file: Option<PathBuf>,
    force: bool,
) -> LedgerResult<()> {
    if !force {
        println!("WARNING: This will overwrite ALL current data!");
        println!("With --file that snapshot is restored. Otherwise the newest cloud snapshot is used when signed in, or you pick a local file.");
        println!("To proceed, run again with --force flag:");
        println!("  debitmanager restore --force");
        return Ok(());
    }

    let service = service(ctx)?;
    println!("Restoring...");
    let outcome = match &file {
        Some(path) => service.restore_from(path).await?,
        None => service.restore_latest().await?,
    };

    match &outcome.source {
        RestoreSource::Remote(file) => println!("Restored cloud snapshot {}", file.name),
        RestoreSource::Local { path } => println!("Restored {}", path.display()),
    }
    if outcome.reloaded {
        println!("Restore complete.");
    } else {
        println!("Restore installed, but the application could not restart.");
        println!("Please restart debitmanager manually.");
    }
    Ok(())
}
