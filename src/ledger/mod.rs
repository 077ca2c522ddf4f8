//! Debtor ledger stored in the live database

pub mod models;
pub mod money;
pub mod repository;

pub use models::{
    Debtor, DebtorDraft, LedgerTransaction, LedgerValidationError, TransactionDraft,
    TransactionKind,
};
pub use money::{Amount, AmountParseError};
pub use repository::LedgerStore;
