//! Snapshot display formatting

use chrono::{DateTime, Utc};

use crate::backup::Snapshot;
use crate::remote::RemoteFile;

/// Format a duration in human-readable form
pub fn format_duration(duration: chrono::Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);

    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }

    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }

    format!("{}mo", days / 30)
}

/// Format a file size in human-readable form
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format local snapshots, newest first, with age and size
pub fn format_snapshot_list(snapshots: &[Snapshot], now: DateTime<Utc>, verbose: bool) -> String {
    let mut output = String::new();
    for (i, snapshot) in snapshots.iter().enumerate() {
        let age = format_duration(now.signed_duration_since(snapshot.created_at));
        if verbose {
            output.push_str(&format!(
                "{}. {}\n   Created: {}\n   Size: {}\n   Age: {}\n   Path: {}\n\n",
                i + 1,
                snapshot.name,
                snapshot.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                format_size(snapshot.size_bytes),
                age,
                snapshot.path.display(),
            ));
        } else {
            output.push_str(&format!(
                "  {}. {} ({} ago, {})\n",
                i + 1,
                snapshot.name,
                age,
                format_size(snapshot.size_bytes),
            ));
        }
    }
    output
}

/// Format remote snapshots with their ids
pub fn format_remote_list(files: &[RemoteFile]) -> String {
    let mut output = String::new();
    for (i, file) in files.iter().enumerate() {
        let created = file
            .created_time
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        output.push_str(&format!(
            "  {}. {} ({})\n     id: {}\n",
            i + 1,
            file.name,
            created,
            file.id
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::path::PathBuf;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(chrono::Duration::seconds(42)), "42s");
        assert_eq!(format_duration(chrono::Duration::minutes(90)), "1h");
        assert_eq!(format_duration(chrono::Duration::days(3)), "3d");
        assert_eq!(format_duration(chrono::Duration::days(65)), "2mo");
        assert_eq!(format_duration(chrono::Duration::seconds(-5)), "0s");
    }

    #[test]
    fn test_snapshot_list_line() {
        let created = Utc.with_ymd_and_hms(2024, 3, 9, 7, 0, 0).unwrap();
        let snapshot = Snapshot {
            name: "debitmanager-2024-03-09T07-00-00-000Z.db".into(),
            path: PathBuf::from("/data/backups/debitmanager-2024-03-09T07-00-00-000Z.db"),
            size_bytes: 4096,
            created_at: created,
            modified_time: None,
        };
        let output = format_snapshot_list(&[snapshot], created + chrono::Duration::hours(2), false);
        assert_eq!(
            output,
            "  1. debitmanager-2024-03-09T07-00-00-000Z.db (2h ago, 4.0 KB)\n"
        );
    }
}
