//! Log journal display formatting

use crate::logging::DbLogEntry;

/// One line per entry, oldest first, with UTC timestamps
pub fn format_log_entries(entries: &[DbLogEntry]) -> String {
    let mut output = String::new();
    for entry in entries {
        output.push_str(&format!(
            "{} {:<5} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            entry.level,
            entry.message
        ));
        if let Some(details) = &entry.details {
            output.push_str(&format!("  [{}]", details));
        }
        output.push('\n');
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_format_log_entries() {
        let entries = vec![
            DbLogEntry {
                timestamp: Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 30).unwrap(),
                level: LogLevel::Info,
                message: "live database handle opened".into(),
                details: Some("path=/data/SQLite/debitmanager".into()),
            },
            DbLogEntry {
                timestamp: Utc.with_ymd_and_hms(2024, 3, 9, 7, 6, 0).unwrap(),
                level: LogLevel::Warn,
                message: "cloud upload failed".into(),
                details: None,
            },
        ];

        let output = format_log_entries(&entries);
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(
            lines[0],
            "2024-03-09 07:05:30.000 INFO  live database handle opened  [path=/data/SQLite/debitmanager]"
        );
        assert_eq!(lines[1], "2024-03-09 07:06:00.000 WARN  cloud upload failed");
    }
}
