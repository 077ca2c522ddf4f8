//! Transaction CLI commands

use chrono::{NaiveDate, NaiveTime};
use clap::Subcommand;

use super::debtor::parse_amount;
use crate::display::format_transaction_register;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{LedgerStore, TransactionDraft, TransactionKind};

/// Transaction subcommands
#[derive(Subcommand)]
pub enum TxnCommands {
    /// Record money lent (out) or a payment received (in)
    Add {
        /// Debtor ID
        debtor: i64,
        /// "in" (payment received) or "out" (money lent)
        kind: String,
        /// Amount (e.g., "12.50")
        amount: String,
        /// Note
        #[arg(short, long)]
        note: Option<String>,
        /// Transaction date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,
        /// Transaction time (HH:MM), defaults to now
        #[arg(short, long)]
        time: Option<String>,
    },
    /// List a debtor's transactions
    List {
        /// Debtor ID
        debtor: i64,
        /// Only "in" or only "out"
        #[arg(short, long)]
        kind: Option<String>,
    },
}

fn parse_kind(input: &str) -> LedgerResult<TransactionKind> {
    TransactionKind::parse(input).ok_or_else(|| {
        LedgerError::Validation(format!(
            "Invalid transaction type: '{}'. Use 'in' or 'out'",
            input
        ))
    })
}

/// Handle a transaction command
pub async fn handle_txn_command(ledger: &LedgerStore, cmd: TxnCommands) -> LedgerResult<()> {
    match cmd {
        TxnCommands::Add {
            debtor,
            kind,
            amount,
            note,
            date,
            time,
        } => {
            let mut draft = TransactionDraft::now(debtor, parse_kind(&kind)?, parse_amount(&amount)?);
            if let Some(date) = date {
                draft.date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|_| {
                    LedgerError::Validation(format!("Invalid date '{}': use YYYY-MM-DD", date))
                })?;
            }
            if let Some(time) = time {
                draft.time = NaiveTime::parse_from_str(&time, "%H:%M").map_err(|_| {
                    LedgerError::Validation(format!("Invalid time '{}': use HH:MM", time))
                })?;
            }
            draft.note = note.filter(|n| !n.trim().is_empty());

            let id = ledger.add_transaction(&draft).await?;
            let balance = ledger.get_debtor(debtor).await?.balance;
            println!(
                "Recorded {} {} (transaction {}); balance now {}",
                draft.kind, draft.amount, id, balance
            );
        }

        TxnCommands::List { debtor, kind } => {
            let kind = kind.as_deref().map(parse_kind).transpose()?;
            let debtor_record = ledger.get_debtor(debtor).await?;
            println!("Debtor: {} (balance {})", debtor_record.name, debtor_record.balance);
            println!();
            print!(
                "{}",
                format_transaction_register(&ledger.transactions_for(debtor, kind).await)
            );
        }
    }

    Ok(())
}
