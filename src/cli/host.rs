//! Terminal implementations of the host collaborators

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::error::{LedgerError, LedgerResult};
use crate::host::{FilePicker, Reloader, SignInPrompt};

/// Reloads by starting a fresh process that opens the restored database
///
/// The current process is expected to exit right after.
#[derive(Debug, Clone, Default)]
pub struct ReexecReloader;

#[async_trait]
impl Reloader for ReexecReloader {
    async fn reload(&self) -> LedgerResult<()> {
        let exe = std::env::current_exe()?;
        info!(exe = %exe.display(), "reloading");
        let status = Command::new(&exe).arg("status").status().await?;
        if status.success() {
            Ok(())
        } else {
            Err(LedgerError::Io(format!(
                "restarted process exited with {}",
                status
            )))
        }
    }
}

/// Asks on the terminal which local snapshot to restore
#[derive(Debug, Clone)]
pub struct PromptPicker {
    backup_dir: PathBuf,
}

impl PromptPicker {
    pub fn new(backup_dir: PathBuf) -> Self {
        Self { backup_dir }
    }
}

/// Candidate files in `dir` with the extension, newest name first
fn candidates(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == extension))
                .collect()
        })
        .unwrap_or_default();
    files.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
    files
}

/// Interpret an answer as a list number or a path; empty means cancel
fn interpret(answer: &str, listed: &[PathBuf]) -> Option<PathBuf> {
    let answer = answer.trim();
    if answer.is_empty() {
        return None;
    }
    match answer.parse::<usize>() {
        Ok(n) if (1..=listed.len()).contains(&n) => Some(listed[n - 1].clone()),
        _ => Some(PathBuf::from(answer)),
    }
}

fn read_line(prompt: &str) -> io::Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{}", prompt)?;
    stderr.flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

#[async_trait]
impl FilePicker for PromptPicker {
    async fn pick_snapshot(&self, extension: &str) -> LedgerResult<Option<PathBuf>> {
        let listed = candidates(&self.backup_dir, extension);
        let mut menu = String::new();
        if listed.is_empty() {
            menu.push_str("No local snapshots found.\n");
        } else {
            menu.push_str("Local snapshots:\n");
            for (i, path) in listed.iter().enumerate() {
                let name = path.file_name().map(|n| n.to_string_lossy().to_string());
                menu.push_str(&format!("  {}. {}\n", i + 1, name.unwrap_or_default()));
            }
        }
        menu.push_str(&format!(
            "Number or path of a .{} file to restore (empty to cancel): ",
            extension
        ));

        let answer = tokio::task::spawn_blocking(move || read_line(&menu))
            .await
            .map_err(|e| LedgerError::Io(format!("prompt failed: {}", e)))??;
        Ok(interpret(&answer, &listed))
    }
}

/// Shows the consent URL and reads the authorization code without echo
#[derive(Debug, Clone, Default)]
pub struct TerminalSignIn;

#[async_trait]
impl SignInPrompt for TerminalSignIn {
    async fn authorization_code(&self, auth_url: &str) -> LedgerResult<String> {
        eprintln!("Open this URL in a browser and approve access:");
        eprintln!();
        eprintln!("  {}", auth_url);
        eprintln!();
        let code = tokio::task::spawn_blocking(|| rpassword::prompt_password("Authorization code: "))
            .await
            .map_err(|e| LedgerError::Io(format!("prompt failed: {}", e)))??;
        Ok(code)
    }
}
