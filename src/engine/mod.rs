//! The transfer engine: one atomic money-movement operation per call.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::errors::{AccountSide, TransferError};
use crate::ledger::{can_debit, Movement};
use crate::storage::{LedgerStore, Result};

/// Orchestrates single money-movement operations against one ledger store.
///
/// The engine holds no in-process locks and never assumes exclusive access
/// to an account between lookup and mutation; serialization of concurrent
/// transfers is entirely the store's transaction mechanism.
pub struct TransferEngine<'s> {
    store: &'s mut LedgerStore,
}

impl<'s> TransferEngine<'s> {
    pub fn new(store: &'s mut LedgerStore) -> Self {
        Self { store }
    }

    /// Moves `amount` from the origin account to the destination account as
    /// one atomic unit: debit, credit, and movement append commit together
    /// or not at all.
    ///
    /// Validation order is deliberate: amount positivity, origin existence,
    /// origin sufficiency, then destination existence.
    pub fn transfer(
        &mut self,
        origin_id: i64,
        destination_id: i64,
        amount: Decimal,
    ) -> Result<Movement> {
        if amount <= Decimal::ZERO {
            warn!(%amount, origin_id, destination_id, "rejected transfer: non-positive amount");
            return Err(TransferError::InvalidAmount(amount));
        }

        // Every early return below drops the unit of work, which rolls the
        // transaction back before the error propagates.
        let uow = self.store.begin()?;

        let origin = uow
            .account(origin_id)?
            .ok_or(TransferError::AccountNotFound {
                side: AccountSide::Origin,
                id: origin_id,
            })?;
        if !can_debit(origin.balance, amount) {
            warn!(
                origin_id,
                balance = %origin.balance,
                requested = %amount,
                "rejected transfer: insufficient funds"
            );
            return Err(TransferError::InsufficientFunds {
                balance: origin.balance,
                requested: amount,
            });
        }
        let destination =
            uow.account(destination_id)?
                .ok_or(TransferError::AccountNotFound {
                    side: AccountSide::Destination,
                    id: destination_id,
                })?;

        uow.apply_balance_delta(origin.id, -amount)?;
        uow.apply_balance_delta(destination.id, amount)?;

        let timestamp = Utc::now();
        let id = uow.append_movement(origin.id, destination.id, amount, timestamp)?;
        uow.commit()?;

        info!(movement = id, origin_id, destination_id, %amount, "transfer committed");
        Ok(Movement {
            id,
            amount,
            timestamp,
            origin_id: origin.id,
            destination_id: destination.id,
        })
    }

    /// Adjusts a single account by `amount` and records a self-referencing
    /// movement. A deposit or correction rather than a two-party transfer,
    /// so the amount may carry either sign; the only precondition is that
    /// the account exists.
    pub fn auto_transfer(&mut self, account_id: i64, amount: Decimal) -> Result<Movement> {
        let uow = self.store.begin()?;

        let account = uow
            .account(account_id)?
            .ok_or(TransferError::AccountNotFound {
                side: AccountSide::Origin,
                id: account_id,
            })?;

        uow.apply_balance_delta(account.id, amount)?;

        let timestamp = Utc::now();
        let id = uow.append_movement(account.id, account.id, amount, timestamp)?;
        uow.commit()?;

        info!(movement = id, account_id, %amount, "self transfer committed");
        Ok(Movement {
            id,
            amount,
            timestamp,
            origin_id: account.id,
            destination_id: account.id,
        })
    }
}
