//! Best-effort lifecycle steps for SQLite handles
//!
//! Checkpointing and closing a handle before its file is copied or replaced
//! are best-effort: the next step stays correct when they silently no-op, so
//! failures are logged through [`best_effort`] and never propagated.

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::error::{LedgerError, LedgerResult};

/// Log and swallow the failure of a best-effort step
///
/// The single place where the "log and continue" policy lives; each
/// best-effort step in the backup and restore flows goes through here.
pub fn best_effort<T>(step: &str, result: LedgerResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(step, error = %e, "best-effort step failed; continuing");
            None
        }
    }
}

/// Merge the write-ahead log into the main file and truncate the log
pub fn checkpoint(conn: &Connection) -> LedgerResult<()> {
    let (busy, log_frames, checkpointed): (i64, i64, i64) =
        conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?;

    if busy != 0 {
        warn!(
            log_frames,
            checkpointed, "checkpoint blocked by another connection; log not truncated"
        );
    } else {
        debug!(log_frames, checkpointed, "wal checkpoint complete");
    }
    Ok(())
}

/// Close a connection, returning the driver error on failure
pub fn close(conn: Connection) -> LedgerResult<()> {
    conn.close().map_err(|(_, e)| LedgerError::from(e))
}

/// Checkpoint (TRUNCATE) then close; both steps best-effort
pub fn checkpoint_and_close(conn: Connection) {
    best_effort("wal checkpoint", checkpoint(&conn));
    best_effort("close handle", close(conn));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::location::side_files;
    use tempfile::TempDir;

    #[test]
    fn test_best_effort_swallows_errors() {
        let ok: Option<u32> = best_effort("step", Ok(7));
        assert_eq!(ok, Some(7));

        let failed: Option<u32> = best_effort("step", Err(LedgerError::Io("disk gone".into())));
        assert_eq!(failed, None);
    }

    #[test]
    fn test_checkpoint_truncates_wal() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("debitmanager");
        let conn = Connection::open(&path).unwrap();
        conn.pragma_update_and_check(None, "journal_mode", "wal", |row| row.get::<_, String>(0))
            .unwrap();
        conn.execute_batch("CREATE TABLE t (v INTEGER); INSERT INTO t VALUES (1);")
            .unwrap();

        let [wal, _] = side_files(&path);
        assert!(std::fs::metadata(&wal).unwrap().len() > 0);

        checkpoint(&conn).unwrap();
        assert_eq!(std::fs::metadata(&wal).unwrap().len(), 0);
    }

    #[test]
    fn test_checkpoint_and_close_on_rollback_journal() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("plain.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE t (v INTEGER);").unwrap();

        // not in WAL mode; the checkpoint is a no-op and close still runs
        checkpoint_and_close(conn);
        assert!(path.exists());
    }
}
