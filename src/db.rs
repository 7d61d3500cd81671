//! Database initialization.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    category::create_category_table, church::create_church_table, entry::create_entry_table,
    reserve_fund::create_reserve_fund_tables, side::LedgerSide, user::create_user_table,
};

/// Create the application's tables if they do not exist yet.
///
/// All tables are created in one exclusive transaction so a half-created
/// schema is never left behind.
///
/// # Errors
/// This function will return an error if a table cannot be created or if
/// there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.pragma_update(None, "foreign_keys", true)?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_church_table(&transaction)?;
    create_user_table(&transaction)?;
    create_category_table(LedgerSide::Revenue, &transaction)?;
    create_category_table(LedgerSide::Expense, &transaction)?;
    create_entry_table(LedgerSide::Revenue, &transaction)?;
    create_entry_table(LedgerSide::Expense, &transaction)?;
    create_reserve_fund_tables(&transaction)?;

    transaction.commit()?;

    Ok(())
}
