//! "Last backup" record
//!
//! A single JSON file, `{ "lastBackupISO": "..." }`, overwritten after each
//! successful backup. An absent or unreadable record means no prior backup;
//! reading it never fails.

use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::LedgerResult;
use crate::storage::{read_json_optional, write_json_atomic};

#[derive(Debug, Serialize, Deserialize)]
struct BackupMetadata {
    #[serde(rename = "lastBackupISO")]
    last_backup_iso: String,
}

/// Reads and writes the last-backup record
#[derive(Debug, Clone)]
pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Timestamp of the most recent successful backup, if any
    pub fn get_last_backup_timestamp(&self) -> Option<DateTime<Utc>> {
        let record = match read_json_optional::<BackupMetadata, _>(&self.path) {
            Ok(record) => record?,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable backup metadata");
                return None;
            }
        };
        match DateTime::parse_from_rfc3339(&record.last_backup_iso) {
            Ok(at) => Some(at.with_timezone(&Utc)),
            Err(e) => {
                warn!(value = %record.last_backup_iso, error = %e, "ignoring malformed backup timestamp");
                None
            }
        }
    }

    pub fn set_last_backup_timestamp(&self, at: DateTime<Utc>) -> LedgerResult<()> {
        let record = BackupMetadata {
            last_backup_iso: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        write_json_atomic(&self.path, &record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_missing_record_is_none() {
        let temp = TempDir::new().unwrap();
        let store = MetadataStore::new(temp.path().join("last_backup.json"));
        assert!(store.get_last_backup_timestamp().is_none());
    }

    #[test]
    fn test_set_then_get() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("last_backup.json");
        let store = MetadataStore::new(path.clone());
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        store.set_last_backup_timestamp(at).unwrap();

        assert_eq!(store.get_last_backup_timestamp(), Some(at));
        let raw = std::fs::read_to_string(path).unwrap();
        assert!(raw.contains("\"lastBackupISO\": \"2024-05-01T12:00:00.000Z\""));
    }

    #[test]
    fn test_corrupt_record_is_none() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("last_backup.json");
        let store = MetadataStore::new(path.clone());

        std::fs::write(&path, "{ truncated").unwrap();
        assert!(store.get_last_backup_timestamp().is_none());

        std::fs::write(&path, r#"{ "lastBackupISO": "yesterday" }"#).unwrap();
        assert!(store.get_last_backup_timestamp().is_none());

        std::fs::write(&path, r#"{ "other": 1 }"#).unwrap();
        assert!(store.get_last_backup_timestamp().is_none());
    }
}
