//! Custom error types for debit-manager
//!
//! Every failure carries a structured kind from the moment it is first
//! detected (inside the handle manager, the SQLite driver conversion or the
//! remote client), so retry and fallback decisions are a typed dispatch on
//! [`ErrorKind`] rather than message inspection.

use thiserror::Error;

/// Coarse classification used by the retry layer and the orchestrators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Handle-related and likely to succeed after a remount
    Transient,
    /// Database, snapshot or remote file missing
    NotFound,
    /// Remote sign-in required or expired
    Auth,
    /// Remote call failed in transport or on the server side
    Network,
    /// Remote quota exhausted or permission denied
    Quota,
    /// Copy verification mismatch or otherwise inconsistent data
    Integrity,
    /// Anything else; terminal for the operation
    Other,
}

/// The main error type for debit-manager operations
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Validation errors for ledger input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Non-recoverable SQLite errors (constraint violations, bad SQL, ...)
    #[error("Database error: {0}")]
    Database(String),

    /// The live handle is closed, missing or left unusable
    #[error("Database handle unavailable: {0}")]
    TransientHandle(String),

    /// Retries against the live handle are exhausted for a write
    #[error("Database unavailable, try again: {0}")]
    Unavailable(String),

    /// The live handle is suspended while a restore runs
    #[error("A restore is in progress; the database is not available")]
    RestoreInProgress,

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Remote authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Remote transport errors
    #[error("Network error: {0}")]
    Network(String),

    /// Remote quota or permission errors
    #[error("Quota or permission error: {0}")]
    Quota(String),

    /// Copy verification errors
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// The user backed out of an interactive step
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

impl LedgerError {
    /// Create a "not found" error for the live database file
    pub fn database_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Database file",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for snapshots
    pub fn snapshot_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Snapshot",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for debtors
    pub fn debtor_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Debtor",
            identifier: identifier.into(),
        }
    }

    /// The structured kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TransientHandle(_) => ErrorKind::Transient,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Auth(_) => ErrorKind::Auth,
            Self::Network(_) => ErrorKind::Network,
            Self::Quota(_) => ErrorKind::Quota,
            Self::Integrity(_) => ErrorKind::Integrity,
            _ => ErrorKind::Other,
        }
    }

    /// Check if a remount followed by a retry may succeed
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// A single summarized message suitable for showing to the user
    ///
    /// Diagnostic detail stays in the log; this text must make sense on its own.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::Transient => "The database is busy. Please try again.".to_string(),
            ErrorKind::NotFound => format!("{}.", self),
            ErrorKind::Auth => "Cloud sign-in is required. Run 'debitmanager auth login'.".to_string(),
            ErrorKind::Network => "Could not reach cloud storage. Check your connection.".to_string(),
            ErrorKind::Quota => "Cloud storage refused the request (quota or permission).".to_string(),
            ErrorKind::Integrity => "The copied file did not match its source.".to_string(),
            ErrorKind::Other => match self {
                Self::Unavailable(_) => "Database unavailable, try again.".to_string(),
                other => other.to_string(),
            },
        }
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// SQLite failures are classified here, where the driver first reports them.
///
/// Misuse of a finalized connection, I/O failures on a file that was swapped
/// underneath the handle, busy or locked files and read-only states left
/// behind by a moved database are the handle-level faults a remount repairs.
impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        match &err {
            rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
                ErrorCode::ApiMisuse
                | ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::SystemIoFailure
                | ErrorCode::CannotOpen
                | ErrorCode::ReadOnly => Self::TransientHandle(err.to_string()),
                _ => Self::Database(err.to_string()),
            },
            rusqlite::Error::InvalidPath(_) => Self::TransientHandle(err.to_string()),
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for LedgerError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// Result type alias for debit-manager operations
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LedgerError::Config("test error".into());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_not_found_error() {
        let err = LedgerError::database_not_found("SQLite/debitmanager");
        assert_eq!(
            err.to_string(),
            "Database file not found: SQLite/debitmanager"
        );
        assert!(err.is_not_found());
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_kinds_are_distinct() {
        assert_eq!(LedgerError::Auth("x".into()).kind(), ErrorKind::Auth);
        assert_eq!(LedgerError::Network("x".into()).kind(), ErrorKind::Network);
        assert_eq!(LedgerError::Quota("x".into()).kind(), ErrorKind::Quota);
        assert_eq!(LedgerError::Integrity("x".into()).kind(), ErrorKind::Integrity);
        assert_eq!(
            LedgerError::TransientHandle("x".into()).kind(),
            ErrorKind::Transient
        );
        assert_eq!(LedgerError::RestoreInProgress.kind(), ErrorKind::Other);
    }

    #[test]
    fn test_sqlite_misuse_is_transient() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_MISUSE),
            None,
        );
        let err: LedgerError = err.into();
        assert!(err.is_transient());
    }

    #[test]
    fn test_sqlite_busy_and_locked_are_transient() {
        for code in [rusqlite::ffi::SQLITE_BUSY, rusqlite::ffi::SQLITE_LOCKED] {
            let err = rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(code), None);
            let err: LedgerError = err.into();
            assert!(err.is_transient(), "code {} not transient", code);
        }
    }

    #[test]
    fn test_sqlite_constraint_is_not_transient() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            Some("CHECK constraint failed".into()),
        );
        let err: LedgerError = err.into();
        assert!(!err.is_transient());
        assert!(matches!(err, LedgerError::Database(_)));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LedgerError = io_err.into();
        assert!(matches!(err, LedgerError::Io(_)));
    }

    #[test]
    fn test_user_message_hides_detail() {
        let err = LedgerError::Network("connection reset by peer (os error 104)".into());
        assert!(!err.user_message().contains("os error"));

        let err = LedgerError::Unavailable("handle closed".into());
        assert_eq!(err.user_message(), "Database unavailable, try again.");
    }
}
