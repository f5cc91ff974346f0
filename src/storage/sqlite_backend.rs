use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{
    params,
    types::Type,
    Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use rust_decimal::Decimal;
use tracing::debug;

use crate::errors::{AccountSide, TransferError};
use crate::ledger::{Account, Movement};

use super::Result;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection options for a ledger database.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub path: PathBuf,
    /// How long a writer waits on the database write lock before the
    /// transaction fails.
    pub busy_timeout: Duration,
}

impl StoreOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

/// SQLite-backed store for accounts and their movement history.
///
/// One store wraps one connection. Concurrent callers each open their own
/// store against the same database file; SQLite's write lock is the sole
/// serialization point for conflicting transfers.
pub struct LedgerStore {
    conn: Connection,
}

impl LedgerStore {
    /// Opens (creating if necessary) a ledger database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(&StoreOptions::new(path.as_ref()))
    }

    pub fn with_options(options: &StoreOptions) -> Result<Self> {
        let conn = Connection::open(&options.path)?;
        Self::from_connection(conn, options.busy_timeout)
    }

    /// Private in-memory database with the same transactional guarantees
    /// minus durability. Intended for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, DEFAULT_BUSY_TIMEOUT)
    }

    fn from_connection(conn: Connection, busy_timeout: Duration) -> Result<Self> {
        conn.busy_timeout(busy_timeout)?;
        // WAL keeps committed transfers durable across restarts while
        // letting readers proceed under a writer.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Creates an account record and returns it with its assigned id.
    pub fn create_account(
        &self,
        name: &str,
        owner_id: Option<i64>,
        opening_balance: Decimal,
    ) -> Result<Account> {
        self.conn.execute(
            "INSERT INTO accounts (name, owner_id, balance) VALUES (?1, ?2, ?3)",
            params![name, owner_id, opening_balance.to_string()],
        )?;
        Ok(Account {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            owner_id,
            balance: opening_balance,
        })
    }

    /// Looks an account up by id.
    pub fn account(&self, id: i64) -> Result<Option<Account>> {
        account_by_id(&self.conn, id)
    }

    /// All accounts owned by the given entity, ordered by id.
    pub fn accounts_by_owner(&self, owner_id: i64) -> Result<Vec<Account>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, owner_id, balance FROM accounts
             WHERE owner_id = ?1 ORDER BY id",
        )?;
        let accounts = stmt
            .query_map([owner_id], read_account)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(accounts)
    }

    /// Rewrites an account record. Record management only; balance changes
    /// that move money must go through the transfer engine instead.
    pub fn update_account(&self, account: &Account) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE accounts SET name = ?1, owner_id = ?2, balance = ?3 WHERE id = ?4",
            params![
                account.name,
                account.owner_id,
                account.balance.to_string(),
                account.id
            ],
        )?;
        if changed == 0 {
            return Err(TransferError::AccountNotFound {
                side: AccountSide::Origin,
                id: account.id,
            });
        }
        Ok(())
    }

    /// Removes an account record. Fails while movements still reference the
    /// account, since the movement ledger is append-only.
    pub fn delete_account(&self, id: i64) -> Result<()> {
        let removed = self
            .conn
            .execute("DELETE FROM accounts WHERE id = ?1", [id])?;
        if removed == 0 {
            return Err(TransferError::AccountNotFound {
                side: AccountSide::Origin,
                id,
            });
        }
        Ok(())
    }

    /// Movement history touching the given account on either side, oldest
    /// first. Indexed on both reference columns.
    pub fn movements_for_account(&self, account_id: i64) -> Result<Vec<Movement>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, amount, timestamp, origin_id, destination_id FROM movements
             WHERE origin_id = ?1 OR destination_id = ?1 ORDER BY id",
        )?;
        let movements = stmt
            .query_map([account_id], read_movement)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(movements)
    }

    /// Total number of persisted movements.
    pub fn movement_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM movements", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Starts one atomic unit of work. `BEGIN IMMEDIATE` takes the write
    /// lock up front, so a concurrent writer can never interleave between
    /// the balance read and the balance mutation.
    pub fn begin(&mut self) -> Result<UnitOfWork<'_>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        debug!("unit of work started");
        Ok(UnitOfWork { tx })
    }
}

/// A scoped transaction over the ledger. Dropping it without calling
/// [`UnitOfWork::commit`] rolls every change back, which keeps failed
/// transfers free of partial state on all exit paths.
pub struct UnitOfWork<'conn> {
    tx: Transaction<'conn>,
}

impl UnitOfWork<'_> {
    /// Reads an account inside the transaction, never from a stale
    /// pre-transaction snapshot.
    pub fn account(&self, id: i64) -> Result<Option<Account>> {
        account_by_id(&self.tx, id)
    }

    /// Applies a relative balance change. Deltas compose, so a transfer
    /// whose origin and destination coincide nets out to zero.
    ///
    /// The arithmetic happens on [`Decimal`] in process; the stored text
    /// column is never pushed through SQLite's float coercion.
    pub fn apply_balance_delta(&self, id: i64, delta: Decimal) -> Result<()> {
        let balance = self.balance_of(id)?;
        self.tx.execute(
            "UPDATE accounts SET balance = ?1 WHERE id = ?2",
            params![(balance + delta).to_string(), id],
        )?;
        Ok(())
    }

    /// Appends a movement record and returns its assigned id.
    pub fn append_movement(
        &self,
        origin_id: i64,
        destination_id: i64,
        amount: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Result<i64> {
        self.tx.execute(
            "INSERT INTO movements (amount, timestamp, origin_id, destination_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                amount.to_string(),
                timestamp.to_rfc3339(),
                origin_id,
                destination_id
            ],
        )?;
        Ok(self.tx.last_insert_rowid())
    }

    /// Commits the unit of work; balance changes and appended movements
    /// become durable together.
    pub fn commit(self) -> Result<()> {
        self.tx.commit()?;
        debug!("unit of work committed");
        Ok(())
    }

    // Callers validate existence first; a missing row here surfaces as a
    // transaction failure, not a user-facing not-found.
    fn balance_of(&self, id: i64) -> Result<Decimal> {
        let raw: String = self.tx.query_row(
            "SELECT balance FROM accounts WHERE id = ?1",
            [id],
            |row| row.get(0),
        )?;
        Ok(parse_decimal(&raw, 0)?)
    }
}

fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            owner_id INTEGER,
            balance TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS movements (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            amount TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            origin_id INTEGER NOT NULL REFERENCES accounts(id),
            destination_id INTEGER NOT NULL REFERENCES accounts(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_movements_origin ON movements(origin_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_movements_destination ON movements(destination_id)",
        [],
    )?;
    Ok(())
}

fn account_by_id(conn: &Connection, id: i64) -> Result<Option<Account>> {
    let account = conn
        .query_row(
            "SELECT id, name, owner_id, balance FROM accounts WHERE id = ?1",
            [id],
            read_account,
        )
        .optional()?;
    Ok(account)
}

fn read_account(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        owner_id: row.get(2)?,
        balance: parse_decimal(&row.get::<_, String>(3)?, 3)?,
    })
}

fn read_movement(row: &Row<'_>) -> rusqlite::Result<Movement> {
    let timestamp: String = row.get(2)?;
    Ok(Movement {
        id: row.get(0)?,
        amount: parse_decimal(&row.get::<_, String>(1)?, 1)?,
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|err| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(err)))?
            .with_timezone(&Utc),
        origin_id: row.get(3)?,
        destination_id: row.get(4)?,
    })
}

fn parse_decimal(raw: &str, idx: usize) -> rusqlite::Result<Decimal> {
    Decimal::from_str(raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}
