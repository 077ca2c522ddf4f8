//! Amount type for ledger balances and transactions
//!
//! Amounts are held in minor units (hundredths) as i64. The schema stores
//! them as REAL in major units, so conversion happens only at the
//! repository boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// A monetary amount in minor units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    pub const fn zero() -> Self {
        Self(0)
    }

    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Convert from the REAL column representation, rounding to the nearest
    /// minor unit
    pub fn from_major(major: f64) -> Self {
        Self((major * 100.0).round() as i64)
    }

    /// Convert to the REAL column representation
    pub fn to_major(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Parse an amount typed by the user
    ///
    /// Accepts "10", "10.5", "10.50" and a leading minus sign. Fractions
    /// beyond two digits are rejected rather than truncated.
    pub fn parse(s: &str) -> Result<Self, AmountParseError> {
        let trimmed = s.trim();
        let invalid = || AmountParseError::InvalidFormat(trimmed.to_string());

        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let (whole, fraction) = match digits.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (digits, ""),
        };

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if fraction.len() > 2 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let fraction: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };

        let minor = whole
            .checked_mul(100)
            .and_then(|v| v.checked_add(fraction))
            .ok_or_else(invalid)?;
        Ok(Self(if negative { -minor } else { minor }))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Add for Amount {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Amount {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

impl SubAssign for Amount {
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Amount {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::zero(), |acc, m| acc + m)
    }
}

/// Error type for amount parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmountParseError {
    InvalidFormat(String),
}

impl fmt::Display for AmountParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountParseError::InvalidFormat(s) => write!(f, "Invalid amount: {}", s),
        }
    }
}

impl std::error::Error for AmountParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Amount::from_minor(1050).to_string(), "10.50");
        assert_eq!(Amount::from_minor(0).to_string(), "0.00");
        assert_eq!(Amount::from_minor(-1050).to_string(), "-10.50");
        assert_eq!(Amount::from_minor(5).to_string(), "0.05");
        assert_eq!(Amount::from_minor(-5).to_string(), "-0.05");
    }

    #[test]
    fn test_parse() {
        assert_eq!(Amount::parse("10.50").unwrap().minor(), 1050);
        assert_eq!(Amount::parse("-10.50").unwrap().minor(), -1050);
        assert_eq!(Amount::parse("10").unwrap().minor(), 1000);
        assert_eq!(Amount::parse("10.5").unwrap().minor(), 1050);
        assert_eq!(Amount::parse(" 0.05 ").unwrap().minor(), 5);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Amount::parse("").is_err());
        assert!(Amount::parse("abc").is_err());
        assert!(Amount::parse("1.234").is_err());
        assert!(Amount::parse("1.2.3").is_err());
        assert!(Amount::parse(".50").is_err());
    }

    #[test]
    fn test_major_conversion() {
        assert_eq!(Amount::from_major(10.5).minor(), 1050);
        assert_eq!(Amount::from_major(0.1 + 0.2).minor(), 30);
        assert_eq!(Amount::from_minor(1999).to_major(), 19.99);
    }

    #[test]
    fn test_arithmetic() {
        let a = Amount::from_minor(1000);
        let b = Amount::from_minor(250);
        assert_eq!((a - b).minor(), 750);
        assert_eq!((a + b).minor(), 1250);
        assert_eq!((-a).minor(), -1000);
        let total: Amount = vec![a, b].into_iter().sum();
        assert_eq!(total.minor(), 1250);
    }
}
