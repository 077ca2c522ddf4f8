//! Transaction display formatting

use crate::ledger::{LedgerTransaction, TransactionKind};

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

/// Format a debtor's transactions as a register
///
/// Money lent shows under "Lent", payments under "Received".
pub fn format_transaction_register(transactions: &[LedgerTransaction]) -> String {
    if transactions.is_empty() {
        return "No transactions found.\n".to_string();
    }

    let mut output = String::new();
    output.push_str(&format!(
        "{:10} {:5} {:>12} {:>12}  {}\n",
        "Date", "Time", "Lent", "Received", "Note"
    ));
    output.push_str(&"-".repeat(60));
    output.push('\n');

    for txn in transactions {
        let amount = txn.amount.to_string();
        let (lent, received) = match txn.kind {
            TransactionKind::Out => (amount.as_str(), ""),
            TransactionKind::In => ("", amount.as_str()),
        };
        output.push_str(&format!(
            "{:10} {:5} {:>12} {:>12}  {}\n",
            txn.date,
            txn.time,
            lent,
            received,
            truncate(txn.note.as_deref().unwrap_or(""), 24),
        ));
    }

    output
}
