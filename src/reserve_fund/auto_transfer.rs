//! The monthly automatic sweep of the available balance into the fund.
//!
//! Triggered by an external scheduler hitting one endpoint on the first
//! day of each month. The sweep is idempotent at month granularity: the
//! fund's `last_transfer_date` guards against running twice in the same
//! calendar month.
//!
//! Unlike deposits and withdrawals, an auto-transfer writes *no* mirrored
//! operating-ledger entry: it only records the transfer on the reserve
//! side, and the next period's available balance recomputation rolls the
//! amount forward. The available balance therefore does not drop after a
//! sweep. This asymmetry is inherited behaviour confirmed with the domain
//! owner; do not add a mirror entry here without revisiting that decision.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};
use serde::Serialize;
use serde_json::json;
use time::Date;

use crate::{
    AppState, Error,
    balance::available_balance,
    database_id::ChurchId,
    reserve_fund::core::{
        FundTransaction, TransactionKind, apply_to_balance, get_or_create_fund,
        record_transaction, set_last_transfer_date,
    },
    timezone::today_in,
};

/// The result of a successful auto-transfer for one church.
#[derive(Debug, PartialEq, Serialize)]
pub struct AutoTransferOutcome {
    /// The transaction appended to the fund's history.
    pub transaction: FundTransaction,
    /// The fund's balance after the sweep.
    pub balance: f64,
}

/// Sweep a church's entire available balance into its reserve fund.
///
/// All writes run in one transaction, so a rejected sweep persists
/// nothing. In particular, a fund row created lazily during the call is
/// rolled back with the rest: a church that has never deposited and has
/// nothing to sweep ends up with no fund row at all.
///
/// # Errors
/// This function will return a:
/// - [Error::AlreadyTransferred] if a sweep already ran this calendar
///   month (no mutation is performed),
/// - [Error::NothingToTransfer] if the available balance is zero or
///   negative,
/// - or [Error::SqlError] if a write fails.
pub fn auto_transfer(
    church_id: ChurchId,
    today: Date,
    connection: &Connection,
) -> Result<AutoTransferOutcome, Error> {
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let fund = get_or_create_fund(church_id, &transaction)?;

    // Day 1 is valid for every month, so replace_day cannot fail here.
    let month_start = today.replace_day(1).unwrap();
    if let Some(last) = fund.last_transfer_date
        && last >= month_start
    {
        return Err(Error::AlreadyTransferred(last));
    }

    let available = available_balance(church_id, &transaction)?;
    if available <= 0.0 {
        return Err(Error::NothingToTransfer);
    }

    let description = format!(
        "Transferência automática de {:02}/{:02}/{}",
        today.day(),
        today.month() as u8,
        today.year()
    );

    let fund_transaction = record_transaction(
        &fund,
        TransactionKind::AutoTransfer,
        available,
        Some(description),
        None,
        &transaction,
    )?;

    let balance = apply_to_balance(fund.id, available, &transaction)?;
    set_last_transfer_date(fund.id, today, &transaction)?;

    transaction.commit()?;

    tracing::info!(
        "church {church_id} auto-transferred {available:.2} into the reserve fund (balance {balance:.2})"
    );

    Ok(AutoTransferOutcome {
        transaction: fund_transaction,
        balance,
    })
}

/// The per-church outcome reported by the trigger endpoint.
#[derive(Debug, PartialEq, Serialize)]
pub struct TenantTransferResult {
    /// The church the sweep ran for.
    pub church_id: ChurchId,
    /// Whether money was moved.
    pub transferred: bool,
    /// The amount moved, when `transferred` is true.
    pub amount: Option<f64>,
    /// A human-readable note, e.g. why the church was skipped.
    pub message: String,
}

/// Run the monthly sweep for every church.
///
/// A church being skipped (already swept this month, nothing to sweep) is
/// a normal outcome and is reported per church; only infrastructure
/// failures propagate as errors.
///
/// # Errors
/// This function will return an [Error::SqlError] if listing churches or
/// one of the sweeps fails with a database error.
pub fn run_auto_transfers(
    today: Date,
    connection: &Connection,
) -> Result<Vec<TenantTransferResult>, Error> {
    let church_ids: Vec<ChurchId> = connection
        .prepare("SELECT id FROM church ORDER BY id")?
        .query_map([], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    let mut results = Vec::with_capacity(church_ids.len());

    for church_id in church_ids {
        let result = match auto_transfer(church_id, today, connection) {
            Ok(outcome) => TenantTransferResult {
                church_id,
                transferred: true,
                amount: Some(outcome.transaction.amount),
                message: format!("transferred {:.2}", outcome.transaction.amount),
            },
            Err(error @ (Error::AlreadyTransferred(_) | Error::NothingToTransfer)) => {
                TenantTransferResult {
                    church_id,
                    transferred: false,
                    amount: None,
                    message: error.to_string(),
                }
            }
            Err(error) => return Err(error),
        };

        results.push(result);
    }

    Ok(results)
}

/// The trigger endpoint invoked by the external scheduler on the first
/// day of each month.
///
/// When a transfer secret is configured, the request must carry it as a
/// bearer token; otherwise the endpoint is open (useful for local
/// development).
pub async fn auto_transfer_endpoint(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Response {
    if let Some(expected) = &state.transfer_secret {
        let presented = bearer.as_ref().map(|header| header.0.token());

        if presented != Some(expected.as_str()) {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unauthorized" })),
            )
                .into_response();
        }
    }

    let outcome = today_in(&state.local_timezone).and_then(|today| {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLock)?;

        run_auto_transfers(today, &connection)
    });

    match outcome {
        Ok(results) => {
            let transferred = results.iter().filter(|result| result.transferred).count();

            Json(json!({
                "success": true,
                "message": format!(
                    "automatic transfer completed for {transferred} of {} churches",
                    results.len()
                ),
                "results": results,
            }))
            .into_response()
        }
        Err(error) => {
            tracing::error!("automatic transfer run failed: {error}");

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": error.to_string(), "success": false })),
            )
                .into_response()
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
