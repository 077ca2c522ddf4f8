//! Cloud sign-in CLI commands

use clap::Subcommand;

use super::host::TerminalSignIn;
use crate::config::paths::LedgerPaths;
use crate::config::settings::Settings;
use crate::error::{LedgerError, LedgerResult};
use crate::remote::DriveClient;

/// Auth subcommands
#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in to cloud storage
    Login,
    /// Forget the stored session
    Logout,
    /// Show whether a session is stored
    Status,
}

/// Handle an auth command
pub async fn handle_auth_command(
    paths: &LedgerPaths,
    settings: &Settings,
    cmd: AuthCommands,
) -> LedgerResult<()> {
    if !settings.remote.enabled {
        return Err(LedgerError::Config(
            "cloud storage is disabled (remote.enabled = false)".into(),
        ));
    }
    let drive = DriveClient::from_settings(paths, &settings.remote)?;
    let auth = drive.authenticator();

    match cmd {
        AuthCommands::Login => {
            auth.authenticate(&TerminalSignIn).await?;
            println!("Signed in. Backups will be uploaded to '{}'.", settings.remote.folder_name);
        }
        AuthCommands::Logout => {
            auth.sign_out().await?;
            println!("Signed out.");
        }
        AuthCommands::Status => match auth.load() {
            Some(credentials) => {
                println!("Signed in to cloud storage.");
                match credentials.expires_at {
                    Some(at) => println!("Access token expires: {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
                    None => println!("Access token expiry: unknown"),
                }
                println!(
                    "Refresh token: {}",
                    if credentials.refresh_token.is_some() { "stored" } else { "none" }
                );
            }
            None => println!("Not signed in."),
        },
    }

    Ok(())
}
