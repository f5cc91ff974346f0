use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An immutable record of one committed transfer.
///
/// Movements reference their accounts one-directionally; account entities
/// keep no movement collections, so loading an account never drags an
/// unbounded history into memory. Use
/// [`LedgerStore::movements_for_account`](crate::storage::LedgerStore::movements_for_account)
/// for the indexed lookup instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Movement {
    /// Surrogate id assigned by the store when the movement is persisted.
    pub id: i64,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    pub origin_id: i64,
    pub destination_id: i64,
}

impl Movement {
    /// True when the movement adjusts a single account.
    pub fn is_self_transfer(&self) -> bool {
        self.origin_id == self.destination_id
    }
}
