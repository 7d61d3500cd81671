//! The available balance calculator.

use rusqlite::Connection;

use crate::{Error, database_id::ChurchId, entry::sum_entries, side::LedgerSide};

/// Compute a church's available balance: the sum of all revenue amounts
/// minus the sum of all expense amounts.
///
/// This is deliberately *not* filtered by the reserve fund convention:
/// deposits into and withdrawals from the fund are real cash movements and
/// must be reflected in the spendable balance, even though the reporting
/// views hide them. Do not "fix" this by applying the filter here.
///
/// # Errors
/// This function will return an [Error::SqlError] if either side's sum
/// fails; no partial result is produced.
pub fn available_balance(church_id: ChurchId, connection: &Connection) -> Result<f64, Error> {
    let revenues = sum_entries(LedgerSide::Revenue, church_id, connection)?;
    let expenses = sum_entries(LedgerSide::Expense, church_id, connection)?;

    Ok(revenues - expenses)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        category::{RESERVE_CATEGORY_NAME, create_category},
        church::{TenantContext, create_church},
        db::initialize,
        entry::{EntryBuilder, PaymentMethod, create_entry},
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

    #[test]
    fn balance_is_zero_for_empty_ledger() {
        let (conn, context) = get_test_connection_and_context();

        assert_eq!(available_balance(context.church_id, &conn).unwrap(), 0.0);
    }

    #[test]
    fn balance_is_revenues_minus_expenses() {
        let (conn, context) = get_test_connection_and_context();
        create_entry(
            LedgerSide::Revenue,
            EntryBuilder::new(1000.0, date!(2026 - 07 - 01), PaymentMethod::Pix),
            &context,
            &conn,
        )
        .unwrap();
        create_entry(
            LedgerSide::Expense,
            EntryBuilder::new(350.0, date!(2026 - 07 - 02), PaymentMethod::Card),
            &context,
            &conn,
        )
        .unwrap();

        assert_eq!(available_balance(context.church_id, &conn).unwrap(), 650.0);
    }

    #[test]
    fn balance_includes_reserve_fund_tagged_entries() {
        // Two revenues of 100, one of them tagged as a reserve fund
        // movement: the reporting filter would drop it, but the balance
        // must count both.
        let (conn, context) = get_test_connection_and_context();
        let reserve_category = create_category(
            LedgerSide::Revenue,
            context.church_id,
            RESERVE_CATEGORY_NAME,
            None,
            None,
            &conn,
        )
        .unwrap();
        create_entry(
            LedgerSide::Revenue,
            EntryBuilder::new(100.0, date!(2026 - 07 - 01), PaymentMethod::Cash)
                .category_id(Some(reserve_category.id))
                .reserve_movement(true),
            &context,
            &conn,
        )
        .unwrap();
        create_entry(
            LedgerSide::Revenue,
            EntryBuilder::new(100.0, date!(2026 - 07 - 01), PaymentMethod::Cash),
            &context,
            &conn,
        )
        .unwrap();

        assert_eq!(available_balance(context.church_id, &conn).unwrap(), 200.0);
    }

    #[test]
    fn balance_is_scoped_to_the_church() {
        let (conn, context) = get_test_connection_and_context();
        let other_church = create_church("Outra Igreja", &conn).unwrap();
        let other_user =
            create_user("bar@baz.qux", "notarealhash", other_church.id, &conn).unwrap();
        create_entry(
            LedgerSide::Revenue,
            EntryBuilder::new(500.0, date!(2026 - 07 - 01), PaymentMethod::Pix),
            &TenantContext {
                church_id: other_church.id,
                user_id: other_user.id,
            },
            &conn,
        )
        .unwrap();

        assert_eq!(available_balance(context.church_id, &conn).unwrap(), 0.0);
    }
}
