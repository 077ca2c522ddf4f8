//! User settings for debit-manager
//!
//! Manages the database naming, cloud storage, generic upload, share,
//! recovery timing and retention preferences. Every field has a serde default
//! so older or partial `config.json` files keep loading.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::paths::LedgerPaths;
use crate::error::LedgerError;

/// Live database naming
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Application name, used as the snapshot filename prefix
    pub app_name: String,
    /// Candidate file names of the live database inside the SQLite directory,
    /// canonical name first
    pub candidates: Vec<String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            app_name: "debitmanager".to_string(),
            candidates: vec!["debitmanager".to_string(), "debitmanager.db".to_string()],
        }
    }
}

/// Cloud storage (Drive v3 API) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// Whether the remote destination is used at all
    pub enabled: bool,
    /// Name of the backup folder in the remote store
    pub folder_name: String,
    /// OAuth client id
    pub client_id: String,
    /// OAuth client secret, for installed-app clients that have one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// OAuth scopes requested at sign-in
    pub scopes: Vec<String>,
    /// Redirect URI registered for the client
    pub redirect_uri: String,
    /// Metadata API base URL
    pub api_base: String,
    /// Upload API base URL
    pub upload_base: String,
    /// OAuth token endpoint
    pub token_url: String,
    /// OAuth authorization endpoint
    pub auth_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            folder_name: "Debit Manager Backups".to_string(),
            client_id: String::new(),
            client_secret: None,
            scopes: vec!["https://www.googleapis.com/auth/drive.file".to_string()],
            redirect_uri: "urn:ietf:wg:oauth:2.0:oob".to_string(),
            api_base: "https://www.googleapis.com/drive/v3".to_string(),
            upload_base: "https://www.googleapis.com/upload/drive/v3".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            timeout_secs: 30,
        }
    }
}

impl RemoteSettings {
    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Generic HTTP upload endpoint (secondary destination)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    /// Endpoint receiving a `PUT` of the snapshot bytes; unset disables it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Optional bearer token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            url: None,
            auth_token: None,
            timeout_secs: 60,
        }
    }
}

/// OS-level share fallback
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareSettings {
    /// Whether the share fallback runs at all
    pub enabled: bool,
    /// Command used to hand the snapshot to the OS; the platform opener
    /// when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl Default for ShareSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            command: None,
        }
    }
}

/// Timing of the remount protocol and the retry layer, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoverySettings {
    /// Window in which a second remount request joins the first
    pub debounce_ms: u64,
    /// Upper bound on waiting for a remounted handle
    pub remount_timeout_ms: u64,
    /// Delay after a handle announces readiness before waiters are released
    pub stabilization_ms: u64,
    /// Delay after checkpoint/close before touching the file
    pub settle_ms: u64,
    /// Retry delay unit; attempt `n` waits `n` units
    pub retry_base_delay_ms: u64,
    /// Retries after the first attempt
    pub max_retries: u32,
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self {
            debounce_ms: 1000,
            remount_timeout_ms: 5000,
            stabilization_ms: 250,
            settle_ms: 150,
            retry_base_delay_ms: 300,
            max_retries: 2,
        }
    }
}

impl RecoverySettings {
    /// Settle delay as a Duration
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Local snapshot retention
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupRetention {
    /// Number of newest local snapshots kept by `prune`
    pub keep_count: u32,
}

impl Default for BackupRetention {
    fn default() -> Self {
        Self { keep_count: 30 }
    }
}

/// Background backup schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    /// Minutes between scheduled backups
    pub interval_minutes: u64,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            interval_minutes: 60,
        }
    }
}

/// User settings for debit-manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub remote: RemoteSettings,

    #[serde(default)]
    pub upload: UploadSettings,

    #[serde(default)]
    pub share: ShareSettings,

    #[serde(default)]
    pub recovery: RecoverySettings,

    #[serde(default)]
    pub backup_retention: BackupRetention,

    #[serde(default)]
    pub schedule: ScheduleSettings,
}

fn default_schema_version() -> u32 {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            database: DatabaseSettings::default(),
            remote: RemoteSettings::default(),
            upload: UploadSettings::default(),
            share: ShareSettings::default(),
            recovery: RecoverySettings::default(),
            backup_retention: BackupRetention::default(),
            schedule: ScheduleSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &LedgerPaths) -> Result<Self, LedgerError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .map_err(|e| LedgerError::Io(format!("Failed to read settings file: {}", e)))?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                LedgerError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &LedgerPaths) -> Result<(), LedgerError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| LedgerError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| LedgerError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }

    /// Settings tuned for tests: millisecond-scale delays, no share command
    pub fn for_tests() -> Self {
        let mut settings = Settings::default();
        settings.recovery = RecoverySettings {
            debounce_ms: 200,
            remount_timeout_ms: 1000,
            stabilization_ms: 10,
            settle_ms: 5,
            retry_base_delay_ms: 10,
            max_retries: 2,
        };
        settings.share.enabled = false;
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.database.app_name, "debitmanager");
        assert_eq!(settings.recovery.max_retries, 2);
        assert_eq!(settings.recovery.remount_timeout_ms, 5000);
        assert!(settings.upload.url.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());

        let mut settings = Settings::default();
        settings.upload.url = Some("https://backup.example.com/put".into());
        settings.backup_retention.keep_count = 5;

        settings.save(&paths).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(
            loaded.upload.url.as_deref(),
            Some("https://backup.example.com/put")
        );
        assert_eq!(loaded.backup_retention.keep_count, 5);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        std::fs::write(
            paths.settings_file(),
            r#"{ "recovery": { "max_retries": 1 } }"#,
        )
        .unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.recovery.max_retries, 1);
        assert_eq!(loaded.recovery.debounce_ms, 1000);
        assert_eq!(loaded.remote.folder_name, "Debit Manager Backups");
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        std::fs::write(paths.settings_file(), "not json").unwrap();

        let err = Settings::load_or_create(&paths).unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }
}
