use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

/// Which side of a transfer an account was looked up for. Single-account
/// operations (self transfers, record management) report `Origin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountSide {
    Origin,
    Destination,
}

impl fmt::Display for AccountSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountSide::Origin => write!(f, "origin"),
            AccountSide::Destination => write!(f, "destination"),
        }
    }
}

/// Error type that captures fund-transfer failures.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("transfer amount must be positive, got {0}")]
    InvalidAmount(Decimal),
    #[error("{side} account {id} not found")]
    AccountNotFound { side: AccountSide, id: i64 },
    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds {
        balance: Decimal,
        requested: Decimal,
    },
    #[error("ledger transaction failed: {0}")]
    TransactionFailure(#[from] rusqlite::Error),
}
