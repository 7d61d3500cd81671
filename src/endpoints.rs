//! The API endpoint URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/revenues/{entry_id}',
//! use [format_endpoint].

/// The route for creating a church and its first user.
pub const REGISTER: &str = "/api/register";
/// The route for signing in a user.
pub const SIGN_IN: &str = "/api/sign_in";

/// The route to create and list revenue entries.
pub const REVENUES: &str = "/api/revenues";
/// The route to delete a single revenue entry.
pub const REVENUE: &str = "/api/revenues/{entry_id}";
/// The route to create and list expense entries.
pub const EXPENSES: &str = "/api/expenses";
/// The route to delete a single expense entry.
pub const EXPENSE: &str = "/api/expenses/{entry_id}";

/// The route to create and list revenue categories.
pub const REVENUE_CATEGORIES: &str = "/api/categories/revenue";
/// The route to create and list expense categories.
pub const EXPENSE_CATEGORIES: &str = "/api/categories/expense";

/// The route for the dashboard summary.
pub const DASHBOARD: &str = "/api/dashboard";
/// The route for the month-by-month report.
pub const MONTHLY_REPORT: &str = "/api/reports/monthly";

/// The route for the reserve fund summary.
pub const RESERVE_FUND: &str = "/api/reserve_fund";
/// The route for the reserve fund's transaction history.
pub const RESERVE_FUND_TRANSACTIONS: &str = "/api/reserve_fund/transactions";
/// The route for depositing into the reserve fund.
pub const RESERVE_FUND_DEPOSIT: &str = "/api/reserve_fund/deposit";
/// The route for withdrawing from the reserve fund.
pub const RESERVE_FUND_WITHDRAW: &str = "/api/reserve_fund/withdraw";
/// The route the external scheduler calls to run the monthly sweep.
pub const RESERVE_FUND_AUTO_TRANSFER: &str = "/api/reserve_fund/auto_transfer";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/api/revenues/{entry_id}',
/// '{entry_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII
/// characters and a single parameter. If no parameter is found, the
/// original `endpoint_path` is returned.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    use super::format_endpoint;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::REGISTER);
        assert_endpoint_is_valid_uri(endpoints::SIGN_IN);
        assert_endpoint_is_valid_uri(endpoints::REVENUES);
        assert_endpoint_is_valid_uri(endpoints::REVENUE);
        assert_endpoint_is_valid_uri(endpoints::EXPENSES);
        assert_endpoint_is_valid_uri(endpoints::EXPENSE);
        assert_endpoint_is_valid_uri(endpoints::REVENUE_CATEGORIES);
        assert_endpoint_is_valid_uri(endpoints::EXPENSE_CATEGORIES);
        assert_endpoint_is_valid_uri(endpoints::DASHBOARD);
        assert_endpoint_is_valid_uri(endpoints::MONTHLY_REPORT);
        assert_endpoint_is_valid_uri(endpoints::RESERVE_FUND);
        assert_endpoint_is_valid_uri(endpoints::RESERVE_FUND_TRANSACTIONS);
        assert_endpoint_is_valid_uri(endpoints::RESERVE_FUND_DEPOSIT);
        assert_endpoint_is_valid_uri(endpoints::RESERVE_FUND_WITHDRAW);
        assert_endpoint_is_valid_uri(endpoints::RESERVE_FUND_AUTO_TRANSFER);
    }

    #[test]
    fn produces_valid_uri() {
        let formatted_path = format_endpoint("/api/revenues/{entry_id}", 1);

        assert_eq!(formatted_path, "/api/revenues/1");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }

    #[test]
    fn returns_original_path_with_no_parameter() {
        let formatted_path = format_endpoint("/api/revenues", 1);

        assert_eq!(formatted_path, "/api/revenues");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }
}
