//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod auth;
pub mod backup;
pub mod debtor;
pub mod host;
pub mod logs;
pub mod txn;

pub use auth::{handle_auth_command, AuthCommands};
pub use backup::{handle_backup_command, handle_restore_command, BackupCommands};
pub use debtor::{handle_debtor_command, DebtorCommands};
pub use logs::handle_logs_command;
pub use txn::{handle_txn_command, TxnCommands};
