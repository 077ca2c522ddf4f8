//! Configuration module for debit-manager
//!
//! This module provides configuration management including:
//! - Data directory and file layout resolution
//! - User settings persistence

pub mod paths;
pub mod settings;

pub use paths::LedgerPaths;
pub use settings::Settings;
