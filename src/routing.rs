//! Application router configuration.
//!
//! Authentication is enforced by extractors ([crate::auth::Claims] and
//! [crate::church::TenantContext]) rather than middleware, so there is no
//! protected/unprotected split here.

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};

use crate::{
    AppState,
    auth::sign_in,
    category::{
        create_expense_category_endpoint, create_revenue_category_endpoint,
        list_expense_categories_endpoint, list_revenue_categories_endpoint,
    },
    endpoints,
    entry::{
        create_expense_endpoint, create_revenue_endpoint, delete_expense_endpoint,
        delete_revenue_endpoint, list_expenses_endpoint, list_revenues_endpoint,
    },
    logging::logging_middleware,
    report::{get_dashboard_endpoint, get_monthly_report_endpoint},
    reserve_fund::{
        auto_transfer_endpoint, deposit_endpoint, get_history_endpoint, get_summary_endpoint,
        withdraw_endpoint,
    },
    user::register_endpoint,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::REGISTER, post(register_endpoint))
        .route(endpoints::SIGN_IN, post(sign_in))
        .route(
            endpoints::REVENUES,
            post(create_revenue_endpoint).get(list_revenues_endpoint),
        )
        .route(endpoints::REVENUE, delete(delete_revenue_endpoint))
        .route(
            endpoints::EXPENSES,
            post(create_expense_endpoint).get(list_expenses_endpoint),
        )
        .route(endpoints::EXPENSE, delete(delete_expense_endpoint))
        .route(
            endpoints::REVENUE_CATEGORIES,
            post(create_revenue_category_endpoint).get(list_revenue_categories_endpoint),
        )
        .route(
            endpoints::EXPENSE_CATEGORIES,
            post(create_expense_category_endpoint).get(list_expense_categories_endpoint),
        )
        .route(endpoints::DASHBOARD, get(get_dashboard_endpoint))
        .route(endpoints::MONTHLY_REPORT, get(get_monthly_report_endpoint))
        .route(endpoints::RESERVE_FUND, get(get_summary_endpoint))
        .route(
            endpoints::RESERVE_FUND_TRANSACTIONS,
            get(get_history_endpoint),
        )
        .route(endpoints::RESERVE_FUND_DEPOSIT, post(deposit_endpoint))
        .route(endpoints::RESERVE_FUND_WITHDRAW, post(withdraw_endpoint))
        .route(
            endpoints::RESERVE_FUND_AUTO_TRANSFER,
            get(auto_transfer_endpoint),
        )
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

// ============================================================================
// TESTS
// ============================================================================
