//! Moving money from the operating ledger into the reserve fund.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, Error,
    balance::available_balance,
    category::get_or_create_reserve_category,
    church::TenantContext,
    entry::{Entry, EntryBuilder, PaymentMethod, create_entry},
    reserve_fund::core::{
        FundTransaction, TransactionKind, apply_to_balance, get_or_create_fund, record_transaction,
    },
    side::LedgerSide,
    timezone::today_in,
};

/// The result of a successful deposit.
#[derive(Debug, PartialEq, Serialize)]
pub struct DepositOutcome {
    /// The synthetic expense entry written to the operating ledger.
    pub entry: Entry,
    /// The transaction appended to the fund's history.
    pub transaction: FundTransaction,
    /// The fund's balance after the deposit.
    pub balance: f64,
}

/// Deposit `amount` from the operating ledger into the church's reserve
/// fund.
///
/// Writes a reserve-tagged expense entry mirroring the movement, appends
/// a deposit to the fund's history and increments the fund's balance, all
/// inside a single database transaction: a failure at any step rolls the
/// whole operation back, so one ledger can never be updated without the
/// other.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if the amount is zero or negative,
/// - [Error::InsufficientOperatingBalance] if the amount exceeds the
///   available balance,
/// - or [Error::SqlError] if a write fails.
pub fn deposit(
    context: &TenantContext,
    amount: f64,
    description: Option<&str>,
    today: Date,
    connection: &Connection,
) -> Result<DepositOutcome, Error> {
    if amount <= 0.0 {
        return Err(Error::InvalidAmount(amount));
    }

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let available = available_balance(context.church_id, &transaction)?;
    if amount > available {
        return Err(Error::InsufficientOperatingBalance { available });
    }

    let fund = get_or_create_fund(context.church_id, &transaction)?;
    let category =
        get_or_create_reserve_category(LedgerSide::Expense, context.church_id, &transaction)?;

    let entry_description = match description {
        Some(text) => format!("Depósito no fundo de reserva: {text}"),
        None => "Depósito no fundo de reserva".to_owned(),
    };

    let entry = create_entry(
        LedgerSide::Expense,
        EntryBuilder::new(amount, today, PaymentMethod::Cash)
            .description(Some(entry_description))
            .category_id(Some(category.id))
            .reserve_movement(true),
        context,
        &transaction,
    )?;

    let fund_description = description
        .map(str::to_owned)
        .unwrap_or_else(|| "Depósito manual".to_owned());

    let fund_transaction = record_transaction(
        &fund,
        TransactionKind::Deposit,
        amount,
        Some(fund_description),
        Some(context.user_id),
        &transaction,
    )?;

    let balance = apply_to_balance(fund.id, amount, &transaction)?;

    transaction.commit()?;

    tracing::info!(
        "church {} deposited {amount:.2} into the reserve fund (balance {balance:.2})",
        context.church_id
    );

    Ok(DepositOutcome {
        entry,
        transaction: fund_transaction,
        balance,
    })
}

/// The form data for a deposit.
#[derive(Debug, Deserialize)]
pub struct TransferForm {
    /// The amount to move, in BRL.
    pub amount: f64,
    /// An optional note to attach to both ledgers.
    pub description: Option<String>,
}

/// A route handler for depositing into the reserve fund.
pub async fn deposit_endpoint(
    State(state): State<AppState>,
    context: TenantContext,
    Json(form): Json<TransferForm>,
) -> Result<impl IntoResponse, Error> {
    let today = today_in(&state.local_timezone)?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLock)?;

    let outcome = deposit(
        &context,
        form.amount,
        form.description.as_deref(),
        today,
        &connection,
    )?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        category::RESERVE_CATEGORY_NAME,
        church::create_church,
        db::initialize,
        entry::list_entries,
        reserve_fund::core::{get_fund, list_transactions},
        user::create_user,
    };

    use super::*;

    fn get_test_connection_and_context() -> (Connection, TenantContext) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let church = create_church("Igreja Central", &conn).unwrap();
        let user = create_user("foo@bar.baz", "notarealhash", church.id, &conn).unwrap();

        (
            conn,
            TenantContext {
                church_id: church.id,
                user_id: user.id,
            },
        )
    }

    fn add_revenue(context: &TenantContext, amount: f64, conn: &Connection) {
        create_entry(
            LedgerSide::Revenue,
            EntryBuilder::new(amount, date!(2026 - 07 - 01), PaymentMethod::Pix),
            context,
            conn,
        )
        .unwrap();
    }

    #[test]
    fn deposit_moves_money_and_mirrors_both_ledgers() {
        // Available balance R$1000.00, deposit 300 with a note.
        let (conn, context) = get_test_connection_and_context();
        add_revenue(&context, 1000.0, &conn);

        let outcome = deposit(&context, 300.0, Some("teste"), date!(2026 - 07 - 15), &conn).unwrap();

        assert_eq!(outcome.balance, 300.0);
        assert_eq!(outcome.entry.amount, 300.0);
        assert_eq!(
            outcome.entry.description.as_deref(),
            Some("Depósito no fundo de reserva: teste")
        );
        assert!(outcome.entry.reserve_movement);
        assert_eq!(outcome.transaction.kind, TransactionKind::Deposit);
        assert_eq!(outcome.transaction.amount, 300.0);

        // The mirrored expense drops the available balance.
        assert_eq!(available_balance(context.church_id, &conn).unwrap(), 700.0);

        let expenses = list_entries(LedgerSide::Expense, context.church_id, &conn).unwrap();
        assert_eq!(expenses.len(), 1);
        assert_eq!(
            expenses[0].category_name.as_deref(),
            Some(RESERVE_CATEGORY_NAME)
        );
    }

    #[test]
    fn deposit_without_description_uses_defaults() {
        let (conn, context) = get_test_connection_and_context();
        add_revenue(&context, 500.0, &conn);

        let outcome = deposit(&context, 100.0, None, date!(2026 - 07 - 15), &conn).unwrap();

        assert_eq!(
            outcome.entry.description.as_deref(),
            Some("Depósito no fundo de reserva")
        );
        assert_eq!(
            outcome.transaction.description.as_deref(),
            Some("Depósito manual")
        );
    }

    #[test]
    fn deposit_rejects_non_positive_amount() {
        let (conn, context) = get_test_connection_and_context();
        add_revenue(&context, 500.0, &conn);

        let result = deposit(&context, -50.0, None, date!(2026 - 07 - 15), &conn);

        assert_eq!(result, Err(Error::InvalidAmount(-50.0)));
    }

    #[test]
    fn deposit_rejects_amount_above_available_balance() {
        let (conn, context) = get_test_connection_and_context();
        add_revenue(&context, 200.0, &conn);

        let result = deposit(&context, 300.0, None, date!(2026 - 07 - 15), &conn);

        assert_eq!(
            result,
            Err(Error::InsufficientOperatingBalance { available: 200.0 })
        );

        // Rejection must leave both ledgers untouched.
        assert!(
            list_entries(LedgerSide::Expense, context.church_id, &conn)
                .unwrap()
                .is_empty()
        );
        assert_eq!(available_balance(context.church_id, &conn).unwrap(), 200.0);
    }

    #[test]
    fn repeated_deposits_reconcile_with_history() {
        let (conn, context) = get_test_connection_and_context();
        add_revenue(&context, 1000.0, &conn);

        deposit(&context, 100.0, None, date!(2026 - 07 - 10), &conn).unwrap();
        deposit(&context, 250.0, None, date!(2026 - 07 - 11), &conn).unwrap();

        let fund = get_fund(context.church_id, &conn).unwrap();
        let history_total: f64 = list_transactions(context.church_id, 50, &conn)
            .unwrap()
            .iter()
            .map(|t| t.amount)
            .sum();

        assert_eq!(fund.balance, 350.0);
        assert_eq!(history_total, fund.balance);
    }
}
