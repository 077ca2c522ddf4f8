//! Collaborators provided by the hosting environment
//!
//! The backup and restore orchestrators never talk to a terminal, a window or
//! the OS directly; they go through these traits. The command-line shell
//! implements them in [`crate::cli::host`], tests use in-memory fakes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::LedgerResult;

/// Restarts the application so every component picks up a restored database
#[async_trait]
pub trait Reloader: Send + Sync {
    async fn reload(&self) -> LedgerResult<()>;
}

/// Lets the user choose a local snapshot file
#[async_trait]
pub trait FilePicker: Send + Sync {
    /// `Ok(None)` when the user cancels. Only files with `extension` qualify.
    async fn pick_snapshot(&self, extension: &str) -> LedgerResult<Option<PathBuf>>;
}

/// Hands a file to the OS so the user can save it elsewhere
#[async_trait]
pub trait SharePort: Send + Sync {
    /// `Ok(false)` when no share mechanism is available
    async fn share(&self, path: &Path) -> LedgerResult<bool>;
}

/// Obtains an OAuth authorization code from the user
#[async_trait]
pub trait SignInPrompt: Send + Sync {
    async fn authorization_code(&self, auth_url: &str) -> LedgerResult<String>;
}
