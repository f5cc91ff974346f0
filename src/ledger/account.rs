use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A ledger account holding a single-currency balance.
///
/// The balance is mutated exclusively inside a committed transfer
/// transaction and stays non-negative after any committed two-party
/// transfer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub name: String,
    /// Owning entity reference (employee or department); carried for
    /// record management, never consulted by the transfer engine.
    pub owner_id: Option<i64>,
    pub balance: Decimal,
}
