//! Canonical resolution of the live database file
//!
//! The live file has historically existed under two names, with and without a
//! `.db` suffix. Everything that needs the path goes through
//! [`DatabaseLocation`]; restore mirrors the installed file to the alternate
//! name so either resolution keeps working.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::paths::LedgerPaths;
use crate::config::settings::DatabaseSettings;
use crate::error::{LedgerError, LedgerResult};

/// Suffixes SQLite appends to the main file name for its side-files
const SIDE_FILE_SUFFIXES: [&str; 3] = ["-wal", "-shm", "-journal"];

/// Where the live database lives and which names it may carry
#[derive(Debug, Clone)]
pub struct DatabaseLocation {
    dir: PathBuf,
    candidates: Vec<String>,
}

impl DatabaseLocation {
    /// Create a location from a directory and candidate names (canonical first)
    pub fn new(dir: PathBuf, candidates: Vec<String>) -> Self {
        Self { dir, candidates }
    }

    /// Build the location from the configured paths and naming settings
    pub fn from_settings(paths: &LedgerPaths, settings: &DatabaseSettings) -> Self {
        Self::new(paths.sqlite_dir(), settings.candidates.clone())
    }

    /// Directory containing the live database
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The name a fresh database is created under
    pub fn canonical(&self) -> PathBuf {
        let name = self
            .candidates
            .first()
            .map(String::as_str)
            .unwrap_or("debitmanager");
        self.dir.join(name)
    }

    /// Every candidate path, canonical first
    pub fn variants(&self) -> Vec<PathBuf> {
        self.candidates.iter().map(|name| self.dir.join(name)).collect()
    }

    // TODO: drop once every install carries the canonical name only; restore
    // is the last caller.
    /// The other naming variant of `path`: `x.db` <-> `x`
    pub fn alternate_of(&self, path: &Path) -> PathBuf {
        match path.extension() {
            Some(ext) if ext == "db" => path.with_extension(""),
            _ => {
                let mut name = path.as_os_str().to_os_string();
                name.push(".db");
                PathBuf::from(name)
            }
        }
    }

    fn prefix(&self) -> String {
        let canonical = self.canonical();
        canonical
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Locate the live database file
    ///
    /// Checks the candidate names first, then falls back to a sorted directory
    /// listing and picks the first regular file sharing the canonical prefix
    /// that is not a side-file.
    pub async fn resolve(&self) -> LedgerResult<PathBuf> {
        for candidate in self.variants() {
            if let Ok(meta) = tokio::fs::metadata(&candidate).await {
                if meta.is_file() {
                    return Ok(candidate);
                }
            }
        }

        let prefix = self.prefix();
        let mut names = Vec::new();
        if let Ok(mut entries) = tokio::fs::read_dir(&self.dir).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                let name = entry.file_name().to_string_lossy().to_string();
                let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
                if is_file && name.starts_with(&prefix) && !is_side_file(&name) {
                    names.push(name);
                }
            }
        }
        names.sort();

        match names.into_iter().next() {
            Some(name) => {
                debug!(file = %name, "resolved database by directory listing");
                Ok(self.dir.join(name))
            }
            None => Err(LedgerError::database_not_found(self.dir.display().to_string())),
        }
    }

    /// Resolve the live file, or the canonical path when none exists yet
    pub async fn resolve_or_canonical(&self) -> PathBuf {
        self.resolve().await.unwrap_or_else(|_| self.canonical())
    }
}

fn is_side_file(name: &str) -> bool {
    SIDE_FILE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// The write-ahead-log and shared-memory side-files of `path`
pub fn side_files(path: &Path) -> [PathBuf; 2] {
    let with_suffix = |suffix: &str| {
        let mut name = path.as_os_str().to_os_string();
        name.push(suffix);
        PathBuf::from(name)
    };
    [with_suffix("-wal"), with_suffix("-shm")]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn location(dir: &Path) -> DatabaseLocation {
        DatabaseLocation::new(
            dir.to_path_buf(),
            vec!["debitmanager".into(), "debitmanager.db".into()],
        )
    }

    #[tokio::test]
    async fn test_resolve_prefers_candidates_in_order() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("debitmanager.db"), b"db").unwrap();
        std::fs::write(temp.path().join("debitmanager"), b"db").unwrap();

        let resolved = location(temp.path()).resolve().await.unwrap();
        assert_eq!(resolved, temp.path().join("debitmanager"));
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_prefix_match() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("debitmanager-wal"), b"wal").unwrap();
        std::fs::write(temp.path().join("debitmanager.sqlite"), b"db").unwrap();

        let resolved = location(temp.path()).resolve().await.unwrap();
        assert_eq!(resolved, temp.path().join("debitmanager.sqlite"));
    }

    #[tokio::test]
    async fn test_resolve_not_found() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("other.db"), b"db").unwrap();

        let err = location(temp.path()).resolve().await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_resolve_missing_directory() {
        let temp = TempDir::new().unwrap();
        let err = location(&temp.path().join("absent"))
            .resolve()
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_alternate_and_side_files() {
        let temp = TempDir::new().unwrap();
        let loc = location(temp.path());

        let plain = temp.path().join("debitmanager");
        let with_ext = temp.path().join("debitmanager.db");
        assert_eq!(loc.alternate_of(&plain), with_ext);
        assert_eq!(loc.alternate_of(&with_ext), plain);

        let [wal, shm] = side_files(&with_ext);
        assert_eq!(wal, temp.path().join("debitmanager.db-wal"));
        assert_eq!(shm, temp.path().join("debitmanager.db-shm"));
    }
}
