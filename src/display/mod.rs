//! Display formatting for terminal output
//!
//! Plain-text tables and detail views for debtors, transactions,
//! snapshots and the database log journal.

pub mod backup;
pub mod debtor;
pub mod logs;
pub mod transaction;

pub use backup::{format_duration, format_remote_list, format_size, format_snapshot_list};
pub use debtor::{format_debtor_details, format_debtor_list};
pub use logs::format_log_entries;
pub use transaction::format_transaction_register;
