//! Tracing layer feeding the database log journal
//!
//! Only events from the handle manager, the backup and restore flows and the
//! retry layer are captured, at `info` and above.

use std::fmt::Debug;
use std::sync::Arc;

use chrono::Utc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use super::journal::{DbLogEntry, DbLogJournal, LogLevel};

/// Module paths whose events end up in the journal
const CAPTURED_TARGETS: [&str; 3] = [
    "debit_manager::db",
    "debit_manager::backup",
    "debit_manager::recovery",
];

/// Whether an event with this metadata belongs in the journal
pub fn is_captured(metadata: &Metadata<'_>) -> bool {
    if *metadata.level() > Level::INFO {
        return false;
    }
    let target = metadata.target();
    CAPTURED_TARGETS.iter().any(|prefix| {
        target == *prefix
            || target
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with("::"))
    })
}

/// Appends captured events to a [`DbLogJournal`]
#[derive(Debug, Clone)]
pub struct DbLogLayer {
    journal: Arc<DbLogJournal>,
}

impl DbLogLayer {
    pub fn new(journal: Arc<DbLogJournal>) -> Self {
        Self { journal }
    }
}

#[derive(Default)]
struct EventText {
    message: String,
    fields: Vec<String>,
}

impl Visit for EventText {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}

fn level_of(level: &Level) -> LogLevel {
    match *level {
        Level::ERROR => LogLevel::Error,
        Level::WARN => LogLevel::Warn,
        Level::INFO => LogLevel::Info,
        _ => LogLevel::Debug,
    }
}

impl<S: Subscriber> Layer<S> for DbLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !is_captured(metadata) {
            return;
        }

        let mut text = EventText::default();
        event.record(&mut text);
        let details = if text.fields.is_empty() {
            None
        } else {
            Some(text.fields.join(" "))
        };

        // a failing journal must not take logging down with it
        let _ = self.journal.append(DbLogEntry {
            timestamp: Utc::now(),
            level: level_of(metadata.level()),
            message: text.message,
            details,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_captures_only_database_targets() {
        let temp = TempDir::new().unwrap();
        let journal = Arc::new(DbLogJournal::open(temp.path().join("db_log.jsonl")));
        let subscriber =
            tracing_subscriber::registry().with(DbLogLayer::new(Arc::clone(&journal)));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "debit_manager::db::remount", request = 3, "remounting live database handle");
            tracing::warn!(target: "debit_manager::backup::manager", "cloud upload failed");
            tracing::error!(target: "debit_manager::recovery", "retries exhausted");
            tracing::debug!(target: "debit_manager::db", "too chatty");
            tracing::info!(target: "debit_manager::ledger::repository", "not a database event");
            tracing::info!(target: "debit_manager::dbx", "lookalike module");
        });

        let entries = journal.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].message, "remounting live database handle");
        assert_eq!(entries[0].details.as_deref(), Some("request=3"));
        assert_eq!(entries[0].level, LogLevel::Info);
        assert_eq!(entries[1].level, LogLevel::Warn);
        assert_eq!(entries[1].details, None);
        assert_eq!(entries[2].level, LogLevel::Error);
    }

    #[test]
    fn test_string_fields_are_unquoted() {
        let temp = TempDir::new().unwrap();
        let journal = Arc::new(DbLogJournal::open(temp.path().join("db_log.jsonl")));
        let subscriber =
            tracing_subscriber::registry().with(DbLogLayer::new(Arc::clone(&journal)));

        tracing::subscriber::with_default(subscriber, || {
            let step = "wal checkpoint";
            tracing::warn!(target: "debit_manager::db::lifecycle", step, "best-effort step failed; continuing");
        });

        assert_eq!(
            journal.entries()[0].details.as_deref(),
            Some("step=wal checkpoint")
        );
    }
}
