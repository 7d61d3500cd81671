//! Read-only views over the reserve fund: the summary card and the
//! transaction history.

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, Error,
    balance::available_balance,
    church::TenantContext,
    reserve_fund::core::{DEFAULT_HISTORY_LIMIT, get_or_create_fund, list_transactions},
};

/// The fund summary shown alongside the operating ledger.
#[derive(Debug, PartialEq, Serialize)]
pub struct FundSummary {
    /// The fund's current balance.
    pub balance: f64,
    /// The operating ledger's available balance, for the transfer forms.
    pub available_balance: f64,
    /// When the last automatic transfer ran, if ever.
    pub last_transfer_date: Option<Date>,
}

/// A route handler for the reserve fund summary.
///
/// Goes through [get_or_create_fund], so the first visit to the reserve
/// page is what lazily creates the fund.
pub async fn get_summary_endpoint(
    State(state): State<AppState>,
    context: TenantContext,
) -> Result<impl IntoResponse, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLock)?;

    let fund = get_or_create_fund(context.church_id, &connection)?;
    let available = available_balance(context.church_id, &connection)?;

    Ok(Json(FundSummary {
        balance: fund.balance,
        available_balance: available,
        last_transfer_date: fund.last_transfer_date,
    }))
}

/// Query parameters for the transaction history.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// How many transactions to return, newest first.
    pub limit: Option<u32>,
}

/// A route handler for the reserve fund's transaction history.
pub async fn get_history_endpoint(
    State(state): State<AppState>,
    context: TenantContext,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLock)?;

    let transactions = list_transactions(
        context.church_id,
        params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
        &connection,
    )?;

    Ok(Json(transactions))
}

// ============================================================================
// TESTS
// ============================================================================
