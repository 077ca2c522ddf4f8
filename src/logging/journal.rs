//! Bounded journal of database and backup log events
//!
//! The newest [`MAX_ENTRIES`] events are kept in memory and mirrored to a
//! line-delimited JSON file, so a later run can show what happened to the
//! database in an earlier one. The file is compacted back to the bound when
//! the journal is opened.

use std::collections::VecDeque;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Number of entries the journal keeps
pub const MAX_ENTRIES: usize = 500;

/// Severity of a journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        f.pad(name)
    }
}

/// One captured log event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbLogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Structured fields of the event, `key=value` separated by spaces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// In-memory ring of recent entries backed by a JSONL file
#[derive(Debug)]
pub struct DbLogJournal {
    path: PathBuf,
    recent: Mutex<VecDeque<DbLogEntry>>,
    capacity: usize,
}

impl DbLogJournal {
    /// Load the journal at `path`, keeping the newest [`MAX_ENTRIES`]
    pub fn open(path: PathBuf) -> Self {
        Self::with_capacity(path, MAX_ENTRIES)
    }

    /// Load the journal with a custom bound
    ///
    /// Unreadable lines are skipped. When the file holds more than
    /// `capacity` entries it is rewritten with only the newest ones.
    pub fn with_capacity(path: PathBuf, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (entries, total) = read_entries(&path);
        let skip = entries.len().saturating_sub(capacity);
        let recent: VecDeque<DbLogEntry> = entries.into_iter().skip(skip).collect();

        let journal = Self {
            path,
            recent: Mutex::new(recent),
            capacity,
        };
        if total > capacity {
            let _ = journal.rewrite();
        }
        journal
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<DbLogEntry>> {
        match self.recent.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Record an entry in memory and append it to the file
    pub fn append(&self, entry: DbLogEntry) -> LedgerResult<()> {
        let line = serde_json::to_string(&entry)
            .map_err(|e| LedgerError::Json(format!("Failed to serialize log entry: {}", e)))?;

        {
            let mut recent = self.lock();
            recent.push_back(entry);
            while recent.len() > self.capacity {
                recent.pop_front();
            }
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LedgerError::Io(format!("Failed to open log journal: {}", e)))?;
        writeln!(file, "{}", line)
            .map_err(|e| LedgerError::Io(format!("Failed to write log entry: {}", e)))?;
        Ok(())
    }

    /// Entries oldest first
    pub fn entries(&self) -> Vec<DbLogEntry> {
        self.lock().iter().cloned().collect()
    }

    /// The newest `count` entries, oldest first
    pub fn recent(&self, count: usize) -> Vec<DbLogEntry> {
        let recent = self.lock();
        let skip = recent.len().saturating_sub(count);
        recent.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every entry and delete the file; returns how many were dropped
    pub fn clear(&self) -> LedgerResult<usize> {
        let dropped = {
            let mut recent = self.lock();
            let dropped = recent.len();
            recent.clear();
            dropped
        };
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(dropped),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(dropped),
            Err(e) => Err(LedgerError::Io(format!(
                "Failed to delete log journal {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn rewrite(&self) -> LedgerResult<()> {
        let entries = self.entries();
        let temp_path = self.path.with_extension("jsonl.tmp");
        let mut file = File::create(&temp_path)
            .map_err(|e| LedgerError::Io(format!("Failed to create log journal: {}", e)))?;
        for entry in &entries {
            let line = serde_json::to_string(entry)?;
            writeln!(file, "{}", line)?;
        }
        file.sync_all()?;
        std::fs::rename(&temp_path, &self.path)
            .map_err(|e| LedgerError::Io(format!("Failed to compact log journal: {}", e)))?;
        Ok(())
    }
}

/// Parsed entries and the number of non-empty lines in the file
fn read_entries(path: &Path) -> (Vec<DbLogEntry>, usize) {
    let Ok(file) = File::open(path) else {
        return (Vec::new(), 0);
    };
    let mut entries = Vec::new();
    let mut total = 0;
    for line in BufReader::new(file).lines().map_while(Result::ok) {
        if line.trim().is_empty() {
            continue;
        }
        total += 1;
        if let Ok(entry) = serde_json::from_str::<DbLogEntry>(&line) {
            entries.push(entry);
        }
    }
    (entries, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(message: &str) -> DbLogEntry {
        DbLogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Info,
            message: message.to_string(),
            details: None,
        }
    }

    #[test]
    fn test_append_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("db_log.jsonl");

        let journal = DbLogJournal::open(path.clone());
        journal.append(entry("handle opened")).unwrap();
        journal.append(entry("handle closed")).unwrap();
        drop(journal);

        let reopened = DbLogJournal::open(path);
        let messages: Vec<_> = reopened.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["handle opened", "handle closed"]);
    }

    #[test]
    fn test_bound_is_kept_in_memory_and_on_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("db_log.jsonl");

        let journal = DbLogJournal::with_capacity(path.clone(), 3);
        for i in 0..5 {
            journal.append(entry(&format!("event {}", i))).unwrap();
        }
        assert_eq!(journal.len(), 3);
        assert_eq!(journal.entries()[0].message, "event 2");
        drop(journal);

        let reopened = DbLogJournal::with_capacity(path.clone(), 3);
        assert_eq!(reopened.len(), 3);
        let lines = std::fs::read_to_string(&path).unwrap().lines().count();
        assert_eq!(lines, 3);
        assert_eq!(reopened.recent(1)[0].message, "event 4");
    }

    #[test]
    fn test_corrupt_lines_are_skipped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("db_log.jsonl");
        let good = serde_json::to_string(&entry("kept")).unwrap();
        std::fs::write(&path, format!("{{ not json\n{}\n\n", good)).unwrap();

        let journal = DbLogJournal::open(path);
        assert_eq!(journal.len(), 1);
        assert_eq!(journal.entries()[0].message, "kept");
    }

    #[test]
    fn test_clear_empties_memory_and_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("db_log.jsonl");
        let journal = DbLogJournal::open(path.clone());
        journal.append(entry("one")).unwrap();
        journal.append(entry("two")).unwrap();

        assert_eq!(journal.clear().unwrap(), 2);
        assert!(journal.is_empty());
        assert!(!path.exists());
        assert_eq!(journal.clear().unwrap(), 0);
    }

    #[test]
    fn test_level_serializes_lowercase() {
        let json = serde_json::to_string(&LogLevel::Warn).unwrap();
        assert_eq!(json, "\"warn\"");
        assert_eq!(LogLevel::Error.to_string(), "ERROR");
    }
}
