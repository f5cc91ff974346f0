//! Ledger domain models and balance decision helpers.

pub mod account;
pub mod movement;
pub mod validate;

pub use account::Account;
pub use movement::Movement;
pub use validate::can_debit;
