//! Reporting views over the operating ledger.
//!
//! Everything here presents the *operating* picture, so every collection
//! of entries is passed through the reserve fund convention filter first.
//! Skipping the filter anywhere would make fund transfers show up as
//! ordinary income or expense and distort period totals, which is the
//! single most important correctness property of the reporting layer.

use std::collections::HashMap;

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
    entry::{EntryWithCategory, list_entries},
    reserve_fund::get_or_create_fund,
    side::LedgerSide,
    timezone::today_in,
};

/// Description substrings that mark an entry as a reserve fund movement.
///
/// Matching on these is a legacy-data fallback: entries written by this
/// server carry an explicit `reserve_movement` flag, but rows imported
/// from the previous system are only identifiable by their text.
const RESERVE_DESCRIPTION_MARKERS: [&str; 3] =
    ["fundo de reserva", "depósito no fundo", "retirada do fundo"];

/// Whether an entry represents a reserve fund movement.
///
/// True if the entry's `reserve_movement` flag is set, if its category is
/// named "fundo de reserva" (case-insensitively), or if its description
/// contains one of the known marker phrases. Entries with neither a
/// category nor a description are never flagged.
pub fn is_reserve_fund_movement(entry: &EntryWithCategory) -> bool {
    if entry.entry.reserve_movement {
        return true;
    }

    if let Some(name) = &entry.category_name
        && name.to_lowercase() == RESERVE_DESCRIPTION_MARKERS[0]
    {
        return true;
    }

    if let Some(description) = &entry.entry.description {
        let description = description.to_lowercase();

        return RESERVE_DESCRIPTION_MARKERS
            .iter()
            .any(|marker| description.contains(marker));
    }

    false
}

/// Drop reserve fund movements from a collection of revenue entries.
pub fn filter_reserve_fund_revenues(entries: Vec<EntryWithCategory>) -> Vec<EntryWithCategory> {
    entries
        .into_iter()
        .filter(|entry| !is_reserve_fund_movement(entry))
        .collect()
}

/// Drop reserve fund movements from a collection of expense entries.
pub fn filter_reserve_fund_expenses(entries: Vec<EntryWithCategory>) -> Vec<EntryWithCategory> {
    entries
        .into_iter()
        .filter(|entry| !is_reserve_fund_movement(entry))
        .collect()
}

/// Aggregates entry amounts by month.
///
/// # Returns
/// HashMap mapping each month (as a Date with day=1) to the sum of entry
/// amounts in that month.
fn aggregate_by_month(entries: &[EntryWithCategory]) -> HashMap<Date, f64> {
    let mut totals = HashMap::new();

    for entry in entries {
        // Day 1 is valid for every month, so replace_day cannot fail here.
        let month = entry.entry.date.replace_day(1).unwrap();
        *totals.entry(month).or_insert(0.0) += entry.entry.amount;
    }

    totals
}

// ============================================================================
// ENDPOINTS
// ============================================================================

/// The balance summary and current-month totals shown on the dashboard.
#[derive(Debug, PartialEq, Serialize)]
pub struct DashboardSummary {
    /// The spendable operating balance (unfiltered).
    pub available_balance: f64,
    /// The reserve fund's balance.
    pub reserve_balance: f64,
    /// The date of the last automatic transfer into the fund, if any.
    pub last_transfer_date: Option<Date>,
    /// This month's revenue total, reserve fund movements excluded.
    pub month_revenues: f64,
    /// This month's expense total, reserve fund movements excluded.
    pub month_expenses: f64,
}

/// A route handler for the dashboard balance summary.
pub async fn get_dashboard_endpoint(
    State(state): State<AppState>,
    context: TenantContext,
) -> Result<impl IntoResponse, Error> {
    let today = today_in(&state.local_timezone)?;
    let current_month = today.replace_day(1).unwrap();

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLock)?;

    let available = available_balance(context.church_id, &connection)?;
    let fund = get_or_create_fund(context.church_id, &connection)?;

    let revenues =
        filter_reserve_fund_revenues(list_entries(LedgerSide::Revenue, context.church_id, &connection)?);
    let expenses =
        filter_reserve_fund_expenses(list_entries(LedgerSide::Expense, context.church_id, &connection)?);

    let month_revenues = aggregate_by_month(&revenues)
        .remove(&current_month)
        .unwrap_or(0.0);
    let month_expenses = aggregate_by_month(&expenses)
        .remove(&current_month)
        .unwrap_or(0.0);

    Ok(Json(DashboardSummary {
        available_balance: available,
        reserve_balance: fund.balance,
        last_transfer_date: fund.last_transfer_date,
        month_revenues,
        month_expenses,
    }))
}

/// The query parameters for the monthly report.
#[derive(Debug, Deserialize)]
pub struct MonthlyReportParams {
    /// The calendar year to report on. Defaults to the current year.
    pub year: Option<i32>,
}

/// One month's operating totals, reserve fund movements excluded.
#[derive(Debug, PartialEq, Serialize)]
pub struct MonthlyTotals {
    /// The month number, 1 through 12.
    pub month: u8,
    /// The month's revenue total.
    pub revenues: f64,
    /// The month's expense total.
    pub expenses: f64,
    /// Revenues minus expenses for the month.
    pub net: f64,
}

/// A route handler for the per-month annual report.
///
/// Returns twelve rows, one per month of the requested year, with the
/// filtered revenue and expense totals.
pub async fn get_monthly_report_endpoint(
    State(state): State<AppState>,
    context: TenantContext,
    Query(params): Query<MonthlyReportParams>,
) -> Result<impl IntoResponse, Error> {
    let year = match params.year {
        Some(year) => year,
        None => today_in(&state.local_timezone)?.year(),
    };

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLock)?;

    let revenues =
        filter_reserve_fund_revenues(list_entries(LedgerSide::Revenue, context.church_id, &connection)?);
    let expenses =
        filter_reserve_fund_expenses(list_entries(LedgerSide::Expense, context.church_id, &connection)?);

    let report = build_monthly_report(year, &revenues, &expenses);

    Ok(Json(report))
}

fn build_monthly_report(
    year: i32,
    revenues: &[EntryWithCategory],
    expenses: &[EntryWithCategory],
) -> Vec<MonthlyTotals> {
    let revenue_totals = aggregate_by_month(revenues);
    let expense_totals = aggregate_by_month(expenses);

    (1..=12u8)
        .map(|month| {
            let key = Date::from_calendar_date(year, time::Month::try_from(month).unwrap(), 1)
                .unwrap();
            let revenues = revenue_totals.get(&key).copied().unwrap_or(0.0);
            let expenses = expense_totals.get(&key).copied().unwrap_or(0.0);

            MonthlyTotals {
                month,
                revenues,
                expenses,
                net: revenues - expenses,
            }
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod aggregation_tests {
    use time::macros::date;

    use crate::entry::{Entry, PaymentMethod};

    use super::*;

    fn make_entry(amount: f64, date: Date) -> EntryWithCategory {
        EntryWithCategory {
            entry: Entry {
                id: 1,
                church_id: 1,
                category_id: None,
                amount,
                description: None,
                payment_method: PaymentMethod::Cash,
                date,
                reserve_movement: false,
                created_by: 1,
                created_at: time::OffsetDateTime::UNIX_EPOCH,
            },
            category_name: None,
        }
    }

    #[test]
    fn aggregate_by_month_sums_within_month() {
        let entries = vec![
            make_entry(100.0, date!(2026 - 03 - 05)),
            make_entry(50.0, date!(2026 - 03 - 28)),
            make_entry(25.0, date!(2026 - 04 - 01)),
        ];

        let totals = aggregate_by_month(&entries);

        assert_eq!(totals[&date!(2026 - 03 - 01)], 150.0);
        assert_eq!(totals[&date!(2026 - 04 - 01)], 25.0);
    }

    #[test]
    fn monthly_report_has_twelve_rows_and_nets() {
        let revenues = vec![
            make_entry(1000.0, date!(2026 - 01 - 10)),
            make_entry(500.0, date!(2026 - 02 - 10)),
        ];
        let expenses = vec![make_entry(300.0, date!(2026 - 01 - 20))];

        let report = build_monthly_report(2026, &revenues, &expenses);

        assert_eq!(report.len(), 12);
        assert_eq!(report[0].revenues, 1000.0);
        assert_eq!(report[0].expenses, 300.0);
        assert_eq!(report[0].net, 700.0);
        assert_eq!(report[1].net, 500.0);
        assert_eq!(report[11].net, 0.0);
    }

    #[test]
    fn monthly_report_ignores_other_years() {
        let revenues = vec![make_entry(1000.0, date!(2025 - 01 - 10))];

        let report = build_monthly_report(2026, &revenues, &[]);

        assert!(report.iter().all(|row| row.revenues == 0.0));
    }
}
