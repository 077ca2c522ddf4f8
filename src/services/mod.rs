//! Service layer for debit-manager
//!
//! The service layer wires the library pieces into the operations a front
//! end calls, and owns the process-wide state they share.

pub mod backup;
pub mod context;

pub use backup::{BackupService, HostEnvironment};
pub use context::AppContext;
