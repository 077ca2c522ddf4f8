//! Database log journal command

use crate::display::format_log_entries;
use crate::error::LedgerResult;
use crate::logging::DbLogJournal;

/// Show the newest `limit` journal entries, or empty the journal
pub fn handle_logs_command(journal: &DbLogJournal, clear: bool, limit: usize) -> LedgerResult<()> {
    if clear {
        let dropped = journal.clear()?;
        println!("Cleared {} log entr{}.", dropped, if dropped == 1 { "y" } else { "ies" });
        return Ok(());
    }

    let entries = journal.recent(limit);
    if entries.is_empty() {
        println!("No database log entries.");
        return Ok(());
    }

    print!("{}", format_log_entries(&entries));
    println!();
    println!(
        "Showing {} of {} entries (journal keeps the newest {}).",
        entries.len(),
        journal.len(),
        crate::logging::MAX_ENTRIES
    );
    Ok(())
}
