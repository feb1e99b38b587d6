use super::transaction::UserId;
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;

/// A strictly positive monetary amount.
///
/// Wrapper around `rust_decimal::Decimal` so that a zero or negative
/// transaction amount is unrepresentable past the intake boundary.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, LedgerError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(LedgerError::Validation(
                "amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = LedgerError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One balance record per user.
///
/// The amount is adjusted only through the store's conditional atomic
/// delta, never by writing an absolute value over a previous read.
#[derive(Debug, Clone, PartialEq)]
pub struct Balance {
    pub user_id: UserId,
    pub amount: Decimal,
    pub last_updated_at: DateTime<Utc>,
}

impl Balance {
    /// The zero balance created at user registration.
    pub fn zero(user_id: UserId) -> Self {
        Self {
            user_id,
            amount: Decimal::ZERO,
            last_updated_at: Utc::now(),
        }
    }
}
