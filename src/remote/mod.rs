//! Remote sync client
//!
//! Cloud storage for snapshots, shaped after the Drive v3 files API:
//!
//! - [`auth`]: credentials, silent refresh and interactive sign-in
//! - [`drive`]: the HTTP client implementing [`RemoteStore`]
//!
//! Failures are classified at the HTTP boundary into
//! [`ErrorKind::Auth`](crate::error::ErrorKind::Auth),
//! [`ErrorKind::Network`](crate::error::ErrorKind::Network) and
//! [`ErrorKind::Quota`](crate::error::ErrorKind::Quota) so the orchestrators
//! can pick a fallback without inspecting messages.

pub mod auth;
pub mod drive;

pub use auth::{Authenticator, Credentials};
pub use drive::DriveClient;

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// A file in the remote backup folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
}

/// Operations the orchestrators need from a remote object store
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Whether a session exists; no network call
    async fn is_signed_in(&self) -> bool;

    /// Resolve the folder by exact name, creating it only when none exists
    async fn get_or_create_folder(&self, name: &str) -> LedgerResult<String>;

    async fn upload(&self, local_path: &Path, folder_id: &str) -> LedgerResult<RemoteFile>;

    /// Files in the folder, newest first as reported by the server
    async fn list(&self, folder_id: &str) -> LedgerResult<Vec<RemoteFile>>;

    async fn download(&self, file_id: &str, dest: &Path) -> LedgerResult<()>;

    async fn delete(&self, file_id: &str) -> LedgerResult<()>;
}

/// Newest first by creation time, then by name
///
/// The server is asked for `createdTime desc` already; this guards against
/// listings that come back in another order.
pub fn sort_newest_first(files: &mut [RemoteFile]) {
    files.sort_by(|a, b| {
        b.created_time
            .cmp(&a.created_time)
            .then_with(|| b.name.cmp(&a.name))
    });
}

/// Map a non-success HTTP status to a classified error
pub fn classify_status(status: StatusCode, context: &str, body: &str) -> LedgerError {
    let detail = if body.is_empty() {
        format!("{}: HTTP {}", context, status)
    } else {
        format!("{}: HTTP {}: {}", context, status, body.trim())
    };
    match status {
        StatusCode::UNAUTHORIZED => LedgerError::Auth(detail),
        StatusCode::FORBIDDEN | StatusCode::INSUFFICIENT_STORAGE => LedgerError::Quota(detail),
        StatusCode::NOT_FOUND => LedgerError::NotFound {
            entity_type: "Remote file",
            identifier: detail,
        },
        // 429, 408, 5xx and anything unexpected
        _ => LedgerError::Network(detail),
    }
}
