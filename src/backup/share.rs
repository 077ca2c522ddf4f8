//! OS-level share fallback
//!
//! Hands the snapshot to an external command so the user can move it to a
//! cloud drive or removable media. With no command configured the platform
//! opener shows the folder containing the snapshot.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::settings::ShareSettings;
use crate::error::{LedgerError, LedgerResult};
use crate::host::SharePort;

/// Runs a share command against the snapshot
#[derive(Debug, Clone)]
pub struct CommandShare {
    settings: ShareSettings,
}

fn platform_opener() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "explorer"
    } else {
        "xdg-open"
    }
}

impl CommandShare {
    pub fn new(settings: ShareSettings) -> Self {
        Self { settings }
    }

    /// Program, leading arguments and the path argument to hand over
    fn command_for(&self, path: &Path) -> Option<(String, Vec<String>)> {
        match self.settings.command.as_deref().map(str::trim) {
            Some(command) if !command.is_empty() => {
                let mut parts = command.split_whitespace().map(str::to_string);
                let program = parts.next()?;
                let mut args: Vec<String> = parts.collect();
                args.push(path.display().to_string());
                Some((program, args))
            }
            _ => {
                let target = path.parent().unwrap_or(path);
                Some((
                    platform_opener().to_string(),
                    vec![target.display().to_string()],
                ))
            }
        }
    }
}

#[async_trait]
impl SharePort for CommandShare {
    async fn share(&self, path: &Path) -> LedgerResult<bool> {
        if !self.settings.enabled {
            return Ok(false);
        }
        let Some((program, args)) = self.command_for(path) else {
            return Ok(false);
        };

        debug!(program = %program, ?args, "sharing snapshot");
        match Command::new(&program).args(&args).status().await {
            Ok(status) if status.success() => Ok(true),
            Ok(status) => {
                warn!(program = %program, %status, "share command failed");
                Ok(false)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(program = %program, "no share mechanism available");
                Ok(false)
            }
            Err(e) => Err(LedgerError::Io(format!(
                "Failed to run share command {}: {}",
                program, e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_configured_command_gets_path_last() {
        let share = CommandShare::new(ShareSettings {
            enabled: true,
            command: Some("cp --backup ".into()),
        });
        let (program, args) = share.command_for(Path::new("/tmp/snap.db")).unwrap();
        assert_eq!(program, "cp");
        assert_eq!(args, vec!["--backup", "/tmp/snap.db"]);
    }

    #[test]
    fn test_default_opens_parent_directory() {
        let share = CommandShare::new(ShareSettings::default());
        let (program, args) = share.command_for(Path::new("/data/backups/snap.db")).unwrap();
        assert_eq!(program, platform_opener());
        assert_eq!(args, vec!["/data/backups"]);
    }

    #[tokio::test]
    async fn test_disabled_share_is_noop() {
        let temp = TempDir::new().unwrap();
        let share = CommandShare::new(ShareSettings {
            enabled: false,
            command: None,
        });
        assert!(!share.share(&temp.path().join("snap.db")).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let temp = TempDir::new().unwrap();
        let share = CommandShare::new(ShareSettings {
            enabled: true,
            command: Some("debitmanager-no-such-share-tool".into()),
        });
        assert!(!share.share(&temp.path().join("snap.db")).await.unwrap());
    }
}
