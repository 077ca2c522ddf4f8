//! Debtor and transaction queries
//!
//! All access goes through [`Recovery`], so a handle lost to a restore or a
//! swapped file is remounted and retried transparently.

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use super::models::{
    Debtor, DebtorDraft, LedgerTransaction, TransactionDraft, TransactionKind,
};
use super::money::Amount;
use crate::error::{LedgerError, LedgerResult};
use crate::recovery::Recovery;

/// Ledger repository over the live database
#[derive(Clone)]
pub struct LedgerStore {
    recovery: Recovery,
}

fn debtor_from_row(row: &Row<'_>) -> rusqlite::Result<Debtor> {
    Ok(Debtor {
        id: row.get("id")?,
        name: row.get("name")?,
        phone_numbers: Vec::new(),
        balance: Amount::from_major(row.get::<_, Option<f64>>("balance")?.unwrap_or(0.0)),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn phone_numbers(conn: &Connection, debtor_id: i64) -> rusqlite::Result<Vec<String>> {
    let mut stmt =
        conn.prepare_cached("SELECT phone_number FROM phone_numbers WHERE debtor_id = ? ORDER BY id")?;
    let rows = stmt.query_map([debtor_id], |row| row.get(0))?;
    rows.collect()
}

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<LedgerTransaction> {
    let kind: String = row.get("type")?;
    let kind = TransactionKind::parse(&kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown transaction type {kind}").into(),
        )
    })?;
    Ok(LedgerTransaction {
        id: row.get("id")?,
        debtor_id: row.get("debtor_id")?,
        kind,
        date: row.get("date")?,
        time: row.get("time")?,
        amount: Amount::from_major(row.get("amount")?),
        note: row.get("note")?,
        created_at: row.get("created_at")?,
    })
}

fn insert_phones(conn: &Connection, debtor_id: i64, phones: &[String]) -> rusqlite::Result<()> {
    let mut stmt =
        conn.prepare_cached("INSERT INTO phone_numbers (debtor_id, phone_number) VALUES (?, ?)")?;
    for phone in phones {
        stmt.execute(params![debtor_id, phone.trim()])?;
    }
    Ok(())
}

impl LedgerStore {
    pub fn new(recovery: Recovery) -> Self {
        Self { recovery }
    }

    /// Add a debtor with their phone numbers, returning the new id
    pub async fn add_debtor(&self, draft: &DebtorDraft) -> LedgerResult<i64> {
        draft.validate()?;
        let id = self
            .recovery
            .write("add_debtor", |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO debtors (name, balance) VALUES (?, ?)",
                    params![draft.name.trim(), draft.balance.to_major()],
                )?;
                let id = tx.last_insert_rowid();
                insert_phones(&tx, id, &draft.phone_numbers)?;
                tx.commit()?;
                Ok(id)
            })
            .await?;
        info!(debtor = id, "debtor added");
        Ok(id)
    }

    /// All debtors ordered by name; empty when the database is unavailable
    pub async fn list_debtors(&self) -> Vec<Debtor> {
        self.recovery
            .read("list_debtors", |conn| {
                let mut stmt = conn.prepare("SELECT * FROM debtors ORDER BY name ASC")?;
                let mut debtors = stmt
                    .query_map([], debtor_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                for debtor in &mut debtors {
                    debtor.phone_numbers = phone_numbers(conn, debtor.id)?;
                }
                Ok(debtors)
            })
            .await
    }

    /// A single debtor by id
    pub async fn get_debtor(&self, id: i64) -> LedgerResult<Debtor> {
        let found: Option<Debtor> = self
            .recovery
            .read("get_debtor", |conn| {
                let debtor = conn
                    .query_row("SELECT * FROM debtors WHERE id = ?", [id], debtor_from_row)
                    .optional()?;
                match debtor {
                    Some(mut debtor) => {
                        debtor.phone_numbers = phone_numbers(conn, id)?;
                        Ok(Some(debtor))
                    }
                    None => Ok(None),
                }
            })
            .await;
        found.ok_or_else(|| LedgerError::debtor_not_found(id.to_string()))
    }

    /// Replace a debtor's name, balance and phone numbers
    pub async fn update_debtor(&self, id: i64, draft: &DebtorDraft) -> LedgerResult<()> {
        draft.validate()?;
        self.recovery
            .write("update_debtor", |conn| {
                let tx = conn.transaction()?;
                let changed = tx.execute(
                    "UPDATE debtors SET name = ?, balance = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
                    params![draft.name.trim(), draft.balance.to_major(), id],
                )?;
                if changed == 0 {
                    return Err(LedgerError::debtor_not_found(id.to_string()));
                }
                tx.execute("DELETE FROM phone_numbers WHERE debtor_id = ?", [id])?;
                insert_phones(&tx, id, &draft.phone_numbers)?;
                tx.commit()?;
                Ok(())
            })
            .await
    }

    /// Overwrite a debtor's balance
    pub async fn update_balance(&self, id: i64, balance: Amount) -> LedgerResult<()> {
        self.recovery
            .write("update_balance", |conn| {
                let changed = conn.execute(
                    "UPDATE debtors SET balance = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
                    params![balance.to_major(), id],
                )?;
                if changed == 0 {
                    return Err(LedgerError::debtor_not_found(id.to_string()));
                }
                Ok(())
            })
            .await
    }

    /// Delete a debtor; phone numbers and transactions cascade
    pub async fn delete_debtor(&self, id: i64) -> LedgerResult<()> {
        self.recovery
            .write("delete_debtor", |conn| {
                let changed = conn.execute("DELETE FROM debtors WHERE id = ?", [id])?;
                if changed == 0 {
                    return Err(LedgerError::debtor_not_found(id.to_string()));
                }
                Ok(())
            })
            .await?;
        info!(debtor = id, "debtor deleted");
        Ok(())
    }

    /// Record a transaction and apply it to the debtor's balance atomically
    pub async fn add_transaction(&self, draft: &TransactionDraft) -> LedgerResult<i64> {
        draft.validate()?;
        let date = draft.date_string();
        let time = draft.time_string();
        let delta = draft.kind.balance_delta(draft.amount);

        self.recovery
            .write("add_transaction", |conn| {
                let tx = conn.transaction()?;
                let changed = tx.execute(
                    "UPDATE debtors SET balance = ROUND(COALESCE(balance, 0) + ?, 2), updated_at = CURRENT_TIMESTAMP WHERE id = ?",
                    params![delta.to_major(), draft.debtor_id],
                )?;
                if changed == 0 {
                    return Err(LedgerError::debtor_not_found(draft.debtor_id.to_string()));
                }
                tx.execute(
                    "INSERT INTO transactions (debtor_id, type, date, time, amount, note) VALUES (?, ?, ?, ?, ?, ?)",
                    params![
                        draft.debtor_id,
                        draft.kind.as_str(),
                        date,
                        time,
                        draft.amount.to_major(),
                        draft.note
                    ],
                )?;
                let id = tx.last_insert_rowid();
                tx.commit()?;
                Ok(id)
            })
            .await
    }

    /// Transactions of a debtor, newest first, optionally of one kind
    pub async fn transactions_for(
        &self,
        debtor_id: i64,
        kind: Option<TransactionKind>,
    ) -> Vec<LedgerTransaction> {
        self.recovery
            .read("transactions_for", |conn| {
                let mut stmt = conn.prepare(
                    "SELECT * FROM transactions WHERE debtor_id = ?1 AND (?2 IS NULL OR type = ?2) \
                     ORDER BY date DESC, time DESC, id DESC",
                )?;
                let rows = stmt
                    .query_map(params![debtor_id, kind.map(|k| k.as_str())], transaction_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await
    }

    /// Sum of every debtor's balance
    pub async fn total_outstanding(&self) -> Amount {
        self.recovery
            .read("total_outstanding", |conn| {
                let total: f64 = conn.query_row(
                    "SELECT COALESCE(SUM(balance), 0) FROM debtors",
                    [],
                    |row| row.get(0),
                )?;
                Ok(Amount::from_major(total))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::Settings;
    use crate::db::{DatabaseLocation, LiveDatabase, RemountCoordinator, RemountTimings};
    use crate::recovery::RetryPolicy;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn store(temp: &TempDir) -> LedgerStore {
        let settings = Settings::for_tests();
        let location = DatabaseLocation::new(
            temp.path().join("SQLite"),
            settings.database.candidates.clone(),
        );
        let coordinator = Arc::new(RemountCoordinator::new(RemountTimings::from(
            &settings.recovery,
        )));
        let db = LiveDatabase::open(location, coordinator).await.unwrap();
        LedgerStore::new(Recovery::new(db, RetryPolicy::from(&settings.recovery)))
    }

    #[tokio::test]
    async fn test_add_and_get_debtor() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp).await;

        let id = store
            .add_debtor(
                &DebtorDraft::new("Ann")
                    .with_phone("555-0100")
                    .with_phone("555-0101")
                    .with_balance(Amount::from_minor(1250)),
            )
            .await
            .unwrap();

        let debtor = store.get_debtor(id).await.unwrap();
        assert_eq!(debtor.name, "Ann");
        assert_eq!(debtor.phone_numbers, vec!["555-0100", "555-0101"]);
        assert_eq!(debtor.balance.minor(), 1250);
    }

    #[tokio::test]
    async fn test_list_is_sorted_by_name() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp).await;
        store.add_debtor(&DebtorDraft::new("Zed")).await.unwrap();
        store.add_debtor(&DebtorDraft::new("Ann")).await.unwrap();

        let names: Vec<_> = store
            .list_debtors()
            .await
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["Ann", "Zed"]);
    }

    #[tokio::test]
    async fn test_transactions_move_balance() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp).await;
        let id = store.add_debtor(&DebtorDraft::new("Ann")).await.unwrap();

        store
            .add_transaction(&TransactionDraft::now(
                id,
                TransactionKind::Out,
                Amount::from_minor(10_000),
            ))
            .await
            .unwrap();
        store
            .add_transaction(&TransactionDraft::now(
                id,
                TransactionKind::In,
                Amount::from_minor(2_550),
            ))
            .await
            .unwrap();

        assert_eq!(store.get_debtor(id).await.unwrap().balance.minor(), 7_450);
        assert_eq!(store.total_outstanding().await.minor(), 7_450);

        let all = store.transactions_for(id, None).await;
        assert_eq!(all.len(), 2);
        let received = store.transactions_for(id, Some(TransactionKind::In)).await;
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].amount.minor(), 2_550);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp).await;
        let id = store
            .add_debtor(&DebtorDraft::new("Ann").with_phone("1"))
            .await
            .unwrap();

        store
            .update_debtor(id, &DebtorDraft::new("Ann B").with_phone("2"))
            .await
            .unwrap();
        let debtor = store.get_debtor(id).await.unwrap();
        assert_eq!(debtor.name, "Ann B");
        assert_eq!(debtor.phone_numbers, vec!["2"]);

        store.update_balance(id, Amount::from_minor(99)).await.unwrap();
        assert_eq!(store.get_debtor(id).await.unwrap().balance.minor(), 99);

        store.delete_debtor(id).await.unwrap();
        assert!(store.get_debtor(id).await.unwrap_err().is_not_found());
        assert!(store.delete_debtor(id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp).await;

        let err = store.add_debtor(&DebtorDraft::new("")).await.unwrap_err();
        assert!(err.is_validation());

        let err = store
            .add_transaction(&TransactionDraft::now(42, TransactionKind::Out, Amount::from_minor(1)))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
