//! Path management for debit-manager
//!
//! ## Path Resolution Order
//!
//! 1. `DEBITMANAGER_DATA_DIR` environment variable (if set)
//! 2. The platform data directory from `directories`
//!    (e.g. `~/.local/share/debitmanager` on Linux)
//!
//! ## Layout
//!
//! ```text
//! <base>/config.json        settings
//! <base>/session.json       cloud credentials
//! <base>/last_backup.json   { "lastBackupISO": ... }
//! <base>/SQLite/            live database and its -wal / -shm side-files
//! <base>/backups/           local snapshots
//! ```

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::LedgerError;

/// Manages all paths used by debit-manager
#[derive(Debug, Clone)]
pub struct LedgerPaths {
    /// Base directory for all debit-manager data
    base_dir: PathBuf,
}

impl LedgerPaths {
    /// Create a new LedgerPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no platform data directory can be determined.
    pub fn new() -> Result<Self, LedgerError> {
        let base_dir = if let Ok(custom) = std::env::var("DEBITMANAGER_DATA_DIR") {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create LedgerPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Directory holding the live database and its side-files
    pub fn sqlite_dir(&self) -> PathBuf {
        self.base_dir.join("SQLite")
    }

    /// Get the backup directory (<base>/backups/)
    pub fn backup_dir(&self) -> PathBuf {
        self.base_dir.join("backups")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the path to the persisted cloud session
    pub fn session_file(&self) -> PathBuf {
        self.base_dir.join("session.json")
    }

    /// Get the path to the last-backup metadata record
    pub fn metadata_file(&self) -> PathBuf {
        self.base_dir.join("last_backup.json")
    }

    /// Get the path to the journal of database and backup log events
    pub fn db_log_file(&self) -> PathBuf {
        self.base_dir.join("db_log.jsonl")
    }

    /// Ensure all required directories exist
    pub fn ensure_directories(&self) -> Result<(), LedgerError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| LedgerError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.sqlite_dir())
            .map_err(|e| LedgerError::Io(format!("Failed to create SQLite directory: {}", e)))?;

        std::fs::create_dir_all(self.backup_dir())
            .map_err(|e| LedgerError::Io(format!("Failed to create backup directory: {}", e)))?;

        Ok(())
    }

    /// Check if debit-manager has been initialized (config file exists)
    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}

fn resolve_default_path() -> Result<PathBuf, LedgerError> {
    ProjectDirs::from("", "", "debitmanager")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| LedgerError::Config("Could not determine a data directory".into()))
}
