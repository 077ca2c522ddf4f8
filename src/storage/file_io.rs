//! File I/O utilities with atomic writes
//!
//! Small JSON records are written through a temp file and a rename so they
//! are either fully replaced or untouched. Database files are copied the same
//! way and their size is checked against the source.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};

/// Read JSON from a file; `Ok(None)` if the file doesn't exist
pub fn read_json_optional<T, P>(path: P) -> LedgerResult<Option<T>>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path)
        .map_err(|e| LedgerError::Io(format!("Failed to open {}: {}", path.display(), e)))?;

    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .map(Some)
        .map_err(|e| LedgerError::Json(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Write JSON to a file atomically (write to temp, then rename)
pub fn write_json_atomic<T, P>(path: P, data: &T) -> LedgerResult<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            LedgerError::Io(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    // same directory, so the rename stays on one filesystem
    let temp_path = path.with_extension("json.tmp");

    let file = File::create(&temp_path)
        .map_err(|e| LedgerError::Io(format!("Failed to create temp file: {}", e)))?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, data)
        .map_err(|e| LedgerError::Json(format!("Failed to serialize data: {}", e)))?;

    writer
        .flush()
        .map_err(|e| LedgerError::Io(format!("Failed to flush data: {}", e)))?;

    writer
        .get_ref()
        .sync_all()
        .map_err(|e| LedgerError::Io(format!("Failed to sync data: {}", e)))?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        LedgerError::Io(format!("Failed to rename temp file: {}", e))
    })?;

    Ok(())
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".partial");
    PathBuf::from(name)
}

/// Copy `src` to `dest` byte-for-byte and verify the size
///
/// The bytes land in `<dest>.partial` first and are renamed into place only
/// after the size matches, so `dest` is never left half-written. Returns the
/// number of bytes copied.
pub async fn copy_verified(src: &Path, dest: &Path) -> LedgerResult<u64> {
    let source_len = tokio::fs::metadata(src)
        .await
        .map_err(|e| LedgerError::Io(format!("Failed to stat {}: {}", src.display(), e)))?
        .len();

    let partial = partial_path(dest);
    let copied = match tokio::fs::copy(src, &partial).await {
        Ok(copied) => copied,
        Err(e) => {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(LedgerError::Io(format!(
                "Failed to copy {} to {}: {}",
                src.display(),
                dest.display(),
                e
            )));
        }
    };

    if copied != source_len {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(LedgerError::Integrity(format!(
            "copied {} bytes from {} but source has {}",
            copied,
            src.display(),
            source_len
        )));
    }

    if let Err(e) = tokio::fs::rename(&partial, dest).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(LedgerError::Io(format!(
            "Failed to move copy into {}: {}",
            dest.display(),
            e
        )));
    }

    debug!(from = %src.display(), to = %dest.display(), bytes = copied, "file copied");
    Ok(copied)
}

/// Delete a file if present; `Ok(false)` when it was already gone
pub async fn remove_if_exists(path: &Path) -> LedgerResult<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(LedgerError::Io(format!(
            "Failed to delete {}: {}",
            path.display(),
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Record {
        value: String,
    }

    #[test]
    fn test_json_roundtrip_and_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("record.json");

        let missing: Option<Record> = read_json_optional(&path).unwrap();
        assert!(missing.is_none());

        let record = Record {
            value: "x".into(),
        };
        write_json_atomic(&path, &record).unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let loaded: Option<Record> = read_json_optional(&path).unwrap();
        assert_eq!(loaded, Some(record));
    }

    #[test]
    fn test_corrupt_json_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("record.json");
        fs::write(&path, "{ not json").unwrap();

        let result: LedgerResult<Option<Record>> = read_json_optional(&path);
        assert!(matches!(result, Err(LedgerError::Json(_))));
    }

    #[tokio::test]
    async fn test_copy_verified() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src.db");
        let dest = temp.path().join("dest.db");
        fs::write(&src, vec![7u8; 4096]).unwrap();

        let copied = copy_verified(&src, &dest).await.unwrap();
        assert_eq!(copied, 4096);
        assert_eq!(fs::read(&dest).unwrap(), fs::read(&src).unwrap());
        assert!(!partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_copy_missing_source_leaves_nothing() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("dest.db");

        assert!(copy_verified(&temp.path().join("absent"), &dest).await.is_err());
        assert!(!dest.exists());
        assert!(!partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_remove_if_exists_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("file");
        fs::write(&path, b"x").unwrap();

        assert!(remove_if_exists(&path).await.unwrap());
        assert!(!remove_if_exists(&path).await.unwrap());
    }
}
