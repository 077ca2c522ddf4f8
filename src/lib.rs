//! debit-manager - personal debt ledger with snapshot backup and restore
//!
//! This library provides the core of the debit-manager application: a SQLite
//! ledger of debtors and transactions, and the subsystem that snapshots that
//! database, ships the snapshots off the device and restores them.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `db`: The live database handle, its lifecycle and remount coordination
//! - `recovery`: Remount-and-retry wrapper for every ledger query
//! - `ledger`: Debtor and transaction models and queries
//! - `storage`: Atomic JSON records and verified file copies
//! - `backup`: Snapshots, backup destinations, restore and scheduling
//! - `remote`: Cloud storage client
//! - `host`: Traits the hosting environment implements
//! - `services`: Process wiring and the backup service front ends call
//! - `cli`, `display`: The command-line shell
//! - `logging`: Tracing subscriber setup and the database log journal
//!
//! # Example
//!
//! ```rust,ignore
//! use debit_manager::config::{paths::LedgerPaths, settings::Settings};
//! use debit_manager::services::AppContext;
//!
//! let paths = LedgerPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let ctx = AppContext::open(paths, settings).await?;
//! let debtors = ctx.ledger().list_debtors().await;
//! ```

pub mod backup;
pub mod cli;
pub mod config;
pub mod db;
pub mod display;
pub mod error;
pub mod host;
pub mod ledger;
pub mod logging;
pub mod recovery;
pub mod remote;
pub mod services;
pub mod storage;

pub use error::{LedgerError, LedgerResult};
