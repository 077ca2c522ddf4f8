//! Logging setup
//!
//! Logs go to stderr so command output on stdout stays clean. `RUST_LOG`
//! wins when set; otherwise the level is `warn`, or `debug` with `--verbose`.
//! Database, backup and recovery events at `info` and above are also kept in
//! a bounded [`DbLogJournal`] regardless of the stderr level.

pub mod capture;
pub mod journal;

pub use capture::{is_captured, DbLogLayer};
pub use journal::{DbLogEntry, DbLogJournal, LogLevel, MAX_ENTRIES};

use std::sync::Arc;

use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Filter used when `RUST_LOG` is unset
pub fn default_filter(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "warn" };
    format!("debit_manager={level},debitmanager={level}")
}

/// Install the global subscriber; later calls are no-ops
pub fn init(verbose: bool, journal: Option<Arc<DbLogJournal>>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let stderr = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_filter(filter);
    let capture = journal.map(|journal| {
        DbLogLayer::new(journal).with_filter(filter_fn(|metadata| is_captured(metadata)))
    });

    let _ = tracing_subscriber::registry()
        .with(stderr)
        .with(capture)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_levels() {
        assert_eq!(
            default_filter(false),
            "debit_manager=warn,debitmanager=warn"
        );
        assert!(default_filter(true).contains("debit_manager=debug"));
        assert!(default_filter(true).parse::<EnvFilter>().is_ok());
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(false, None);
        init(true, None);
    }
}
