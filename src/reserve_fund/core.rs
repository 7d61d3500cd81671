//! Defines the core data models and database queries for the reserve fund.

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    database_id::{ChurchId, FundId, UserId},
};

/// How many transactions the history view returns when no limit is given.
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

// ============================================================================
// MODELS
// ============================================================================

/// A church's reserve fund. One row per church, created lazily on first
/// access and never deleted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReserveFund {
    /// The ID of the fund.
    pub id: FundId,
    /// The church the fund belongs to.
    pub church_id: ChurchId,
    /// The fund's running balance. Non-negative by construction: every
    /// mutation goes through a guarded transfer operation.
    pub balance: f64,
    /// The date of the most recent automatic transfer, if any. Guards the
    /// once-per-month idempotency of [crate::reserve_fund::auto_transfer].
    pub last_transfer_date: Option<Date>,
}

/// The kind of a reserve fund transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// A manual transfer from the operating ledger into the fund.
    Deposit,
    /// A manual transfer from the fund back to the operating ledger.
    Withdrawal,
    /// The monthly automatic sweep of the available balance.
    AutoTransfer,
}

impl TransactionKind {
    /// The kind as its database/API text form.
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
            TransactionKind::AutoTransfer => "auto_transfer",
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(TransactionKind::Deposit),
            "withdrawal" => Ok(TransactionKind::Withdrawal),
            "auto_transfer" => Ok(TransactionKind::AutoTransfer),
            _ => Err(()),
        }
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|_| FromSqlError::InvalidType)
    }
}

/// One append-only entry in a reserve fund's history.
///
/// Invariant: for any fund, the sum of deposit and auto-transfer amounts
/// minus the sum of withdrawal amounts equals the fund's current balance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundTransaction {
    /// The ID of the transaction.
    pub id: i64,
    /// The church the transaction belongs to.
    pub church_id: ChurchId,
    /// The fund the transaction belongs to.
    pub fund_id: FundId,
    /// The kind of movement.
    pub kind: TransactionKind,
    /// The amount moved. Always positive; the kind says the direction.
    pub amount: f64,
    /// A free-text description of the movement.
    pub description: Option<String>,
    /// The user who performed the operation. `None` for automatic
    /// transfers triggered by the external scheduler.
    pub created_by: Option<UserId>,
    /// When the transaction was recorded.
    pub created_at: OffsetDateTime,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the reserve fund tables in the database.
///
/// The unique index on `reserve_fund.church_id` is what makes
/// [get_or_create_fund] safe under concurrent first access.
///
/// # Errors
/// Returns an error if the tables cannot be created or if there is an SQL error.
pub fn create_reserve_fund_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS reserve_fund (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                church_id INTEGER NOT NULL UNIQUE,
                balance REAL NOT NULL DEFAULT 0,
                last_transfer_date TEXT,
                FOREIGN KEY(church_id) REFERENCES church(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    connection.execute(
        "CREATE TABLE IF NOT EXISTS reserve_fund_transaction (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                church_id INTEGER NOT NULL,
                fund_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                amount REAL NOT NULL CHECK(amount > 0),
                description TEXT,
                created_by INTEGER,
                created_at TEXT NOT NULL,
                FOREIGN KEY(church_id) REFERENCES church(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(fund_id) REFERENCES reserve_fund(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_fund_transaction_fund
         ON reserve_fund_transaction(fund_id, id);",
        (),
    )?;

    Ok(())
}

/// Get a church's reserve fund, creating it with a zero balance if it
/// does not exist yet.
///
/// Uses insert-if-absent against the unique church_id index, so two
/// concurrent first accesses cannot create duplicate funds.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn get_or_create_fund(church_id: ChurchId, connection: &Connection) -> Result<ReserveFund, Error> {
    connection
        .prepare("INSERT OR IGNORE INTO reserve_fund (church_id, balance) VALUES (?1, 0)")?
        .execute((church_id,))?;

    get_fund(church_id, connection)
}

/// Get a church's reserve fund, failing if it does not exist.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the church has no fund yet,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_fund(church_id: ChurchId, connection: &Connection) -> Result<ReserveFund, Error> {
    let fund = connection
        .prepare(
            "SELECT id, church_id, balance, last_transfer_date FROM reserve_fund
             WHERE church_id = :church_id",
        )?
        .query_one(&[(":church_id", &church_id)], map_fund_row)?;

    Ok(fund)
}

/// Append a transaction to a fund's history.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if the amount is zero or negative,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn record_transaction(
    fund: &ReserveFund,
    kind: TransactionKind,
    amount: f64,
    description: Option<String>,
    created_by: Option<UserId>,
    connection: &Connection,
) -> Result<FundTransaction, Error> {
    if amount <= 0.0 {
        return Err(Error::InvalidAmount(amount));
    }

    let created_at = OffsetDateTime::now_utc();

    connection
        .prepare(
            "INSERT INTO reserve_fund_transaction
             (church_id, fund_id, kind, amount, description, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?
        .execute((
            fund.church_id,
            fund.id,
            kind,
            amount,
            &description,
            created_by,
            created_at,
        ))?;

    Ok(FundTransaction {
        id: connection.last_insert_rowid(),
        church_id: fund.church_id,
        fund_id: fund.id,
        kind,
        amount,
        description,
        created_by,
        created_at,
    })
}

/// Apply a signed delta to a fund's balance and return the new balance.
///
/// The increment is evaluated inside the database (`balance = balance + ?`)
/// rather than read-modify-write in the application, so two operations on
/// the same fund cannot lose an update to each other.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the fund does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn apply_to_balance(fund_id: FundId, delta: f64, connection: &Connection) -> Result<f64, Error> {
    let balance = connection
        .prepare("UPDATE reserve_fund SET balance = balance + ?1 WHERE id = ?2 RETURNING balance")?
        .query_one((delta, fund_id), |row| row.get(0))?;

    Ok(balance)
}

/// Record the date of an automatic transfer on the fund row.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn set_last_transfer_date(
    fund_id: FundId,
    date: Date,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "UPDATE reserve_fund SET last_transfer_date = ?1 WHERE id = ?2",
        (date, fund_id),
    )?;

    Ok(())
}

/// Retrieve the newest `limit` transactions for a church's fund.
///
/// Unlike [get_or_create_fund], a missing fund here is a domain error: the
/// history view is only reachable after the fund summary has been loaded,
/// so a missing fund means get-or-create itself failed upstream.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the church has no fund,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn list_transactions(
    church_id: ChurchId,
    limit: u32,
    connection: &Connection,
) -> Result<Vec<FundTransaction>, Error> {
    let fund = get_fund(church_id, connection)?;

    connection
        .prepare(
            "SELECT id, church_id, fund_id, kind, amount, description, created_by, created_at
             FROM reserve_fund_transaction
             WHERE fund_id = :fund_id
             ORDER BY id DESC
             LIMIT :limit",
        )?
        .query_map(
            &[(":fund_id", &fund.id), (":limit", &(limit as i64))],
            map_transaction_row,
        )?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::SqlError))
        .collect()
}

fn map_fund_row(row: &Row) -> Result<ReserveFund, rusqlite::Error> {
    Ok(ReserveFund {
        id: row.get(0)?,
        church_id: row.get(1)?,
        balance: row.get(2)?,
        last_transfer_date: row.get(3)?,
    })
}

fn map_transaction_row(row: &Row) -> Result<FundTransaction, rusqlite::Error> {
    Ok(FundTransaction {
        id: row.get(0)?,
        church_id: row.get(1)?,
        fund_id: row.get(2)?,
        kind: row.get(3)?,
        amount: row.get(4)?,
        description: row.get(5)?,
        created_by: row.get(6)?,
        created_at: row.get(7)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================
