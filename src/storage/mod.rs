//! Durable storage for accounts and movements.

pub mod sqlite_backend;

use crate::errors::TransferError;

pub type Result<T> = std::result::Result<T, TransferError>;

pub use sqlite_backend::{LedgerStore, StoreOptions, UnitOfWork};
