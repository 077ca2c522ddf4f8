//! Debtor and transaction records
//!
//! These mirror the rows of the `debtors`, `phone_numbers` and `transactions`
//! tables. A debtor's balance is what they owe: `Out` transactions (money
//! lent) raise it and `In` transactions (payments received) lower it.

use chrono::{Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::money::Amount;

/// A person who owes money
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Debtor {
    pub id: i64,
    pub name: String,
    pub phone_numbers: Vec<String>,
    pub balance: Amount,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Input for creating or updating a debtor
#[derive(Debug, Clone, Default)]
pub struct DebtorDraft {
    pub name: String,
    pub phone_numbers: Vec<String>,
    pub balance: Amount,
}

impl DebtorDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone_numbers.push(phone.into());
        self
    }

    pub fn with_balance(mut self, balance: Amount) -> Self {
        self.balance = balance;
        self
    }

    /// Validate the draft
    pub fn validate(&self) -> Result<(), LedgerValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(LedgerValidationError::EmptyName);
        }
        if name.len() > 100 {
            return Err(LedgerValidationError::NameTooLong(name.len()));
        }
        if self.phone_numbers.iter().any(|p| p.trim().is_empty()) {
            return Err(LedgerValidationError::EmptyPhoneNumber);
        }
        Ok(())
    }
}

/// Direction of a ledger transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    /// Payment received from the debtor
    In,
    /// Money lent to the debtor
    Out,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
        }
    }

    /// Parse the stored or typed form, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN" => Some(Self::In),
            "OUT" => Some(Self::Out),
            _ => None,
        }
    }

    /// Signed effect on the debtor's balance
    pub fn balance_delta(&self, amount: Amount) -> Amount {
        match self {
            Self::In => -amount,
            Self::Out => amount,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded transaction against a debtor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerTransaction {
    pub id: i64,
    pub debtor_id: i64,
    pub kind: TransactionKind,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub time: String,
    pub amount: Amount,
    pub note: Option<String>,
    pub created_at: Option<String>,
}

/// Input for recording a transaction
#[derive(Debug, Clone)]
pub struct TransactionDraft {
    pub debtor_id: i64,
    pub kind: TransactionKind,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub amount: Amount,
    pub note: Option<String>,
}

impl TransactionDraft {
    /// A transaction stamped with the current local date and time
    pub fn now(debtor_id: i64, kind: TransactionKind, amount: Amount) -> Self {
        let now = Local::now().naive_local();
        Self {
            debtor_id,
            kind,
            date: now.date(),
            time: now.time(),
            amount,
            note: None,
        }
    }

    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    pub fn time_string(&self) -> String {
        self.time.format("%H:%M").to_string()
    }

    pub fn validate(&self) -> Result<(), LedgerValidationError> {
        if !self.amount.is_positive() {
            return Err(LedgerValidationError::NonPositiveAmount(self.amount));
        }
        Ok(())
    }
}

/// Validation failures for ledger input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerValidationError {
    EmptyName,
    NameTooLong(usize),
    EmptyPhoneNumber,
    NonPositiveAmount(Amount),
}

impl fmt::Display for LedgerValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Debtor name cannot be empty"),
            Self::NameTooLong(len) => {
                write!(f, "Debtor name too long ({} chars, max 100)", len)
            }
            Self::EmptyPhoneNumber => write!(f, "Phone numbers cannot be empty"),
            Self::NonPositiveAmount(amount) => {
                write!(f, "Transaction amount must be positive, got {}", amount)
            }
        }
    }
}

impl std::error::Error for LedgerValidationError {}

impl From<LedgerValidationError> for crate::error::LedgerError {
    fn from(err: LedgerValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_validation() {
        assert!(DebtorDraft::new("Ann").with_phone("555-0100").validate().is_ok());
        assert_eq!(
            DebtorDraft::new("  ").validate(),
            Err(LedgerValidationError::EmptyName)
        );
        assert!(matches!(
            DebtorDraft::new("a".repeat(101)).validate(),
            Err(LedgerValidationError::NameTooLong(101))
        ));
        assert_eq!(
            DebtorDraft::new("Ann").with_phone("").validate(),
            Err(LedgerValidationError::EmptyPhoneNumber)
        );
    }

    #[test]
    fn test_kind_parse_and_delta() {
        assert_eq!(TransactionKind::parse("in"), Some(TransactionKind::In));
        assert_eq!(TransactionKind::parse("OUT"), Some(TransactionKind::Out));
        assert_eq!(TransactionKind::parse("sideways"), None);

        let amount = Amount::from_minor(500);
        assert_eq!(TransactionKind::Out.balance_delta(amount).minor(), 500);
        assert_eq!(TransactionKind::In.balance_delta(amount).minor(), -500);
    }

    #[test]
    fn test_transaction_draft_formatting() {
        let draft = TransactionDraft {
            debtor_id: 1,
            kind: TransactionKind::Out,
            date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
            time: NaiveTime::from_hms_opt(7, 5, 30).unwrap(),
            amount: Amount::from_minor(100),
            note: None,
        };
        assert_eq!(draft.date_string(), "2024-03-09");
        assert_eq!(draft.time_string(), "07:05");
        assert!(draft.validate().is_ok());

        let zero = TransactionDraft {
            amount: Amount::zero(),
            ..draft
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_debtor_serializes_camel_case() {
        let debtor = Debtor {
            id: 1,
            name: "Ann".into(),
            phone_numbers: vec!["555".into()],
            balance: Amount::from_minor(250),
            created_at: None,
            updated_at: None,
        };
        let json = serde_json::to_value(&debtor).unwrap();
        assert_eq!(json["phoneNumbers"][0], "555");
        assert_eq!(json["balance"], 250);
    }
}
