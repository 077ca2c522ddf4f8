//! Debtor CLI commands

use clap::Subcommand;

use crate::display::{format_debtor_details, format_debtor_list, format_transaction_register};
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{Amount, DebtorDraft, LedgerStore};

/// Debtor subcommands
#[derive(Subcommand)]
pub enum DebtorCommands {
    /// Add a debtor
    Add {
        /// Debtor name
        name: String,
        /// Phone number (repeat for several)
        #[arg(short, long = "phone")]
        phones: Vec<String>,
        /// Opening balance (e.g., "25.50")
        #[arg(short, long, default_value = "0")]
        balance: String,
    },
    /// List debtors with balances
    List,
    /// Show a debtor and their transactions
    Show {
        /// Debtor ID
        id: i64,
    },
    /// Overwrite a debtor's balance
    Balance {
        /// Debtor ID
        id: i64,
        /// New balance
        amount: String,
    },
    /// Delete a debtor and their transactions
    Delete {
        /// Debtor ID
        id: i64,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

pub(crate) fn parse_amount(input: &str) -> LedgerResult<Amount> {
    Amount::parse(input)
        .map_err(|e| LedgerError::Validation(format!("Invalid amount '{}': {}", input, e)))
}

/// Handle a debtor command
pub async fn handle_debtor_command(ledger: &LedgerStore, cmd: DebtorCommands) -> LedgerResult<()> {
    match cmd {
        DebtorCommands::Add {
            name,
            phones,
            balance,
        } => {
            let mut draft = DebtorDraft::new(name).with_balance(parse_amount(&balance)?);
            for phone in phones {
                draft = draft.with_phone(phone);
            }
            let id = ledger.add_debtor(&draft).await?;
            println!("Added debtor {} (ID {})", draft.name.trim(), id);
        }

        DebtorCommands::List => {
            let debtors = ledger.list_debtors().await;
            print!("{}", format_debtor_list(&debtors));
            if debtors.is_empty() {
                println!();
            }
        }

        DebtorCommands::Show { id } => {
            let debtor = ledger.get_debtor(id).await?;
            print!("{}", format_debtor_details(&debtor));
            println!();
            print!(
                "{}",
                format_transaction_register(&ledger.transactions_for(id, None).await)
            );
        }

        DebtorCommands::Balance { id, amount } => {
            let amount = parse_amount(&amount)?;
            ledger.update_balance(id, amount).await?;
            println!("Balance of debtor {} set to {}", id, amount);
        }

        DebtorCommands::Delete { id, force } => {
            let debtor = ledger.get_debtor(id).await?;
            if !force {
                println!(
                    "This deletes {} and all of their transactions (balance {}).",
                    debtor.name, debtor.balance
                );
                println!("To proceed, run again with --force flag:");
                println!("  debitmanager debtor delete {} --force", id);
                return Ok(());
            }
            ledger.delete_debtor(id).await?;
            println!("Deleted debtor {}", debtor.name);
        }
    }

    Ok(())
}
