//! Ledger schema migrations
//!
//! Versions are tracked in `PRAGMA user_version`. The schema is part of what a
//! snapshot carries byte-for-byte, so migrations only ever append.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::LedgerResult;

/// Current schema version
pub const DATABASE_VERSION: i64 = 2;

const SCHEMA_V1: &str = "
    CREATE TABLE debtors (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        balance REAL DEFAULT 0,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );
    CREATE TABLE phone_numbers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        debtor_id INTEGER NOT NULL,
        phone_number TEXT NOT NULL,
        FOREIGN KEY (debtor_id) REFERENCES debtors(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_debtor_id ON phone_numbers(debtor_id);
";

const SCHEMA_V2: &str = "
    CREATE TABLE transactions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        debtor_id INTEGER NOT NULL,
        type TEXT NOT NULL CHECK(type IN ('IN', 'OUT')),
        date TEXT NOT NULL,
        time TEXT NOT NULL,
        amount REAL NOT NULL,
        note TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (debtor_id) REFERENCES debtors(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_debtor_id ON transactions(debtor_id);
";

/// Read the schema version of an open database
pub fn user_version(conn: &Connection) -> LedgerResult<i64> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// Bring the database up to [`DATABASE_VERSION`]
pub fn migrate(conn: &Connection) -> LedgerResult<()> {
    // per-connection setting, not persisted in the file
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    let mut version = user_version(conn)?;
    debug!(version, "checking schema version");
    if version >= DATABASE_VERSION {
        return Ok(());
    }

    if version == 0 {
        info!("applying v1 schema");
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "wal", |row| row.get(0))?;
        debug!(journal_mode = %mode, "journal mode set");
        conn.execute_batch(SCHEMA_V1)?;
        version = 1;
    }

    if version == 1 {
        info!("applying v2 schema");
        conn.execute_batch(SCHEMA_V2)?;
    }

    conn.execute_batch(&format!("PRAGMA user_version = {}", DATABASE_VERSION))?;
    Ok(())
}
