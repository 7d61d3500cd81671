//! Moving money from the reserve fund back into the operating ledger.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};
use serde::Serialize;
use time::Date;

use crate::{
    AppState, Error,
    category::get_or_create_reserve_category,
    church::TenantContext,
    entry::{Entry, EntryBuilder, PaymentMethod, create_entry},
    reserve_fund::core::{
        FundTransaction, TransactionKind, apply_to_balance, get_or_create_fund, record_transaction,
    },
    reserve_fund::deposit::TransferForm,
    side::LedgerSide,
    timezone::today_in,
};

/// The result of a successful withdrawal.
#[derive(Debug, PartialEq, Serialize)]
pub struct WithdrawOutcome {
    /// The synthetic revenue entry written to the operating ledger.
    pub entry: Entry,
    /// The transaction appended to the fund's history.
    pub transaction: FundTransaction,
    /// The fund's balance after the withdrawal.
    pub balance: f64,
}

/// Withdraw `amount` from the church's reserve fund back into the
/// operating ledger.
///
/// The guard is fund-local: only the fund's balance matters, the
/// operating balance is irrelevant to a withdrawal. Like
/// [crate::reserve_fund::deposit], all writes happen in one database
/// transaction.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if the amount is zero or negative,
/// - [Error::InsufficientReserveBalance] if the amount exceeds the fund's
///   balance,
/// - or [Error::SqlError] if a write fails.
pub fn withdraw(
    context: &TenantContext,
    amount: f64,
    description: Option<&str>,
    today: Date,
    connection: &Connection,
) -> Result<WithdrawOutcome, Error> {
    if amount <= 0.0 {
        return Err(Error::InvalidAmount(amount));
    }

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let fund = get_or_create_fund(context.church_id, &transaction)?;
    if fund.balance < amount {
        return Err(Error::InsufficientReserveBalance {
            balance: fund.balance,
        });
    }

    let category =
        get_or_create_reserve_category(LedgerSide::Revenue, context.church_id, &transaction)?;

    let entry_description = match description {
        Some(text) => format!("Retirada do fundo de reserva: {text}"),
        None => "Retirada do fundo de reserva".to_owned(),
    };

    let entry = create_entry(
        LedgerSide::Revenue,
        EntryBuilder::new(amount, today, PaymentMethod::Cash)
            .description(Some(entry_description))
            .category_id(Some(category.id))
            .reserve_movement(true),
        context,
        &transaction,
    )?;

    let fund_description = description
        .map(str::to_owned)
        .unwrap_or_else(|| "Retirada manual".to_owned());

    let fund_transaction = record_transaction(
        &fund,
        TransactionKind::Withdrawal,
        amount,
        Some(fund_description),
        Some(context.user_id),
        &transaction,
    )?;

    let balance = apply_to_balance(fund.id, -amount, &transaction)?;

    transaction.commit()?;

    tracing::info!(
        "church {} withdrew {amount:.2} from the reserve fund (balance {balance:.2})",
        context.church_id
    );

    Ok(WithdrawOutcome {
        entry,
        transaction: fund_transaction,
        balance,
    })
}

/// A route handler for withdrawing from the reserve fund.
pub async fn withdraw_endpoint(
    State(state): State<AppState>,
    context: TenantContext,
    Json(form): Json<TransferForm>,
) -> Result<impl IntoResponse, Error> {
    let today = today_in(&state.local_timezone)?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLock)?;

    let outcome = withdraw(
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
        balance::available_balance,
        church::create_church,
        db::initialize,
        entry::list_entries,
        reserve_fund::core::{get_fund, list_transactions},
        reserve_fund::deposit::deposit,
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

    fn fund_with_balance(context: &TenantContext, balance: f64, conn: &Connection) {
        create_entry(
            LedgerSide::Revenue,
            EntryBuilder::new(balance * 2.0, date!(2026 - 07 - 01), PaymentMethod::Pix),
            context,
            conn,
        )
        .unwrap();
        deposit(context, balance, None, date!(2026 - 07 - 02), conn).unwrap();
    }

    #[test]
    fn withdraw_moves_money_and_mirrors_both_ledgers() {
        let (conn, context) = get_test_connection_and_context();
        fund_with_balance(&context, 300.0, &conn);
        let available_before = available_balance(context.church_id, &conn).unwrap();

        let outcome = withdraw(&context, 200.0, None, date!(2026 - 07 - 15), &conn).unwrap();

        assert_eq!(outcome.balance, 100.0);
        assert_eq!(outcome.transaction.kind, TransactionKind::Withdrawal);
        assert_eq!(
            outcome.entry.description.as_deref(),
            Some("Retirada do fundo de reserva")
        );
        assert!(outcome.entry.reserve_movement);

        // The mirrored revenue raises the available balance.
        assert_eq!(
            available_balance(context.church_id, &conn).unwrap(),
            available_before + 200.0
        );
    }

    #[test]
    fn withdraw_rejects_amount_above_fund_balance() {
        // Fund holds 300; withdrawing 500 must fail and change nothing.
        let (conn, context) = get_test_connection_and_context();
        fund_with_balance(&context, 300.0, &conn);
        let revenues_before = list_entries(LedgerSide::Revenue, context.church_id, &conn)
            .unwrap()
            .len();

        let result = withdraw(&context, 500.0, None, date!(2026 - 07 - 15), &conn);

        assert_eq!(
            result,
            Err(Error::InsufficientReserveBalance { balance: 300.0 })
        );
        assert_eq!(get_fund(context.church_id, &conn).unwrap().balance, 300.0);
        assert_eq!(
            list_entries(LedgerSide::Revenue, context.church_id, &conn)
                .unwrap()
                .len(),
            revenues_before
        );
    }

    #[test]
    fn withdraw_rejects_non_positive_amount() {
        let (conn, context) = get_test_connection_and_context();

        let result = withdraw(&context, 0.0, None, date!(2026 - 07 - 15), &conn);

        assert_eq!(result, Err(Error::InvalidAmount(0.0)));
    }

    #[test]
    fn withdraw_from_untouched_fund_fails_with_zero_balance() {
        let (conn, context) = get_test_connection_and_context();

        let result = withdraw(&context, 50.0, None, date!(2026 - 07 - 15), &conn);

        assert_eq!(result, Err(Error::InsufficientReserveBalance { balance: 0.0 }));
    }

    #[test]
    fn deposits_and_withdrawals_reconcile_with_history() {
        // Conservation invariant: balance equals deposits plus
        // auto-transfers minus withdrawals recorded in the history.
        let (conn, context) = get_test_connection_and_context();
        fund_with_balance(&context, 500.0, &conn);
        withdraw(&context, 120.0, None, date!(2026 - 07 - 16), &conn).unwrap();
        withdraw(&context, 80.0, None, date!(2026 - 07 - 17), &conn).unwrap();

        let fund = get_fund(context.church_id, &conn).unwrap();
        let signed_total: f64 = list_transactions(context.church_id, 50, &conn)
            .unwrap()
            .iter()
            .map(|t| match t.kind {
                TransactionKind::Deposit | TransactionKind::AutoTransfer => t.amount,
                TransactionKind::Withdrawal => -t.amount,
            })
            .sum();

        assert_eq!(fund.balance, 300.0);
        assert_eq!(signed_total, fund.balance);
    }
}
