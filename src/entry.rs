//! The operating ledger: atomic revenue and expense entries.
//!
//! Entries are append-only from the core's point of view (no edit), and
//! deletion refuses entries whose `reserve_movement` flag is set, because
//! those mirror a reserve fund transaction and deleting one side would
//! desynchronise the two ledgers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    AppState, Error,
    category::get_category,
    church::TenantContext,
    database_id::{CategoryId, ChurchId, EntryId, UserId},
    side::LedgerSide,
    timezone::today_in,
};

/// How a money movement was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Physical cash.
    Cash,
    /// The Brazilian instant payment system.
    Pix,
    /// Debit or credit card.
    Card,
    /// Bank transfer.
    Transfer,
}

impl PaymentMethod {
    /// The payment method as its database/API text form.
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Pix => "pix",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "pix" => Ok(PaymentMethod::Pix),
            "card" => Ok(PaymentMethod::Card),
            "transfer" => Ok(PaymentMethod::Transfer),
            _ => Err(()),
        }
    }
}

impl ToSql for PaymentMethod {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for PaymentMethod {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|_| FromSqlError::InvalidType)
    }
}

/// A single money movement in the operating ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    /// The ID of the entry.
    pub id: EntryId,
    /// The church the entry belongs to.
    pub church_id: ChurchId,
    /// The category the entry belongs to, if any.
    pub category_id: Option<CategoryId>,
    /// The amount of money moved. Always positive; the ledger side says
    /// whether it came in or went out.
    pub amount: f64,
    /// A free-text description of the movement.
    pub description: Option<String>,
    /// How the movement was settled.
    pub payment_method: PaymentMethod,
    /// The calendar date of the movement (no time component).
    pub date: Date,
    /// Whether this entry was written by a reserve fund operation.
    pub reserve_movement: bool,
    /// The user who recorded the entry.
    pub created_by: UserId,
    /// When the entry was recorded.
    pub created_at: OffsetDateTime,
}

/// The data needed to insert a new ledger entry.
///
/// Build one with [EntryBuilder::new] and the chained setters, then pass
/// it to [create_entry].
#[derive(Debug, Clone, PartialEq)]
pub struct EntryBuilder {
    /// The amount of money moved. Must be positive.
    pub amount: f64,
    /// The calendar date of the movement.
    pub date: Date,
    /// How the movement was settled.
    pub payment_method: PaymentMethod,
    /// A free-text description of the movement.
    pub description: Option<String>,
    /// The category the entry belongs to, if any.
    pub category_id: Option<CategoryId>,
    /// Whether this entry mirrors a reserve fund transaction.
    pub reserve_movement: bool,
}

impl EntryBuilder {
    /// Start building a ledger entry.
    pub fn new(amount: f64, date: Date, payment_method: PaymentMethod) -> Self {
        Self {
            amount,
            date,
            payment_method,
            description: None,
            category_id: None,
            reserve_movement: false,
        }
    }

    /// Set the description for the entry.
    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Set the category for the entry.
    pub fn category_id(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    /// Mark the entry as mirroring a reserve fund transaction.
    pub fn reserve_movement(mut self, reserve_movement: bool) -> Self {
        self.reserve_movement = reserve_movement;
        self
    }
}

/// Create a ledger entry table for one side.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_entry_table(
    side: LedgerSide,
    connection: &Connection,
) -> Result<(), rusqlite::Error> {
    connection.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                church_id INTEGER NOT NULL,
                category_id INTEGER,
                amount REAL NOT NULL CHECK(amount > 0),
                description TEXT,
                payment_method TEXT NOT NULL,
                date TEXT NOT NULL,
                reserve_movement INTEGER NOT NULL DEFAULT 0,
                created_by INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY(church_id) REFERENCES church(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(category_id) REFERENCES {category_table}(id) ON UPDATE CASCADE ON DELETE SET NULL
                )",
            table = side.entry_table(),
            category_table = side.category_table(),
        ),
        (),
    )?;

    connection.execute(
        &format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_church_date ON {table}(church_id, date);",
            table = side.entry_table()
        ),
        (),
    )?;

    Ok(())
}

/// Create a new entry in the operating ledger.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if the amount is zero or negative,
/// - [Error::InvalidCategory] if the category does not belong to the
///   church on this ledger side,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_entry(
    side: LedgerSide,
    builder: EntryBuilder,
    context: &TenantContext,
    connection: &Connection,
) -> Result<Entry, Error> {
    if builder.amount <= 0.0 {
        return Err(Error::InvalidAmount(builder.amount));
    }

    if let Some(category_id) = builder.category_id {
        // A 'not found' here means the ID is either bogus or belongs to
        // another church; both get the same error so nothing leaks.
        get_category(side, category_id, context.church_id, connection).map_err(
            |error| match error {
                Error::NotFound => Error::InvalidCategory(Some(category_id)),
                error => error,
            },
        )?;
    }

    let created_at = OffsetDateTime::now_utc();

    connection
        .prepare(&format!(
            "INSERT INTO {table}
             (church_id, category_id, amount, description, payment_method, date, reserve_movement, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            table = side.entry_table()
        ))?
        .execute((
            context.church_id,
            builder.category_id,
            builder.amount,
            &builder.description,
            builder.payment_method,
            builder.date,
            builder.reserve_movement,
            context.user_id,
            created_at,
        ))?;

    Ok(Entry {
        id: connection.last_insert_rowid(),
        church_id: context.church_id,
        category_id: builder.category_id,
        amount: builder.amount,
        description: builder.description,
        payment_method: builder.payment_method,
        date: builder.date,
        reserve_movement: builder.reserve_movement,
        created_by: context.user_id,
        created_at,
    })
}

/// A ledger entry joined with its category's name, as consumed by the
/// reporting layer and entry listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryWithCategory {
    /// The ledger entry itself.
    #[serde(flatten)]
    pub entry: Entry,
    /// The name of the entry's category, if it has one.
    pub category_name: Option<String>,
}

/// Retrieve all of a church's entries for one ledger side, newest first.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn list_entries(
    side: LedgerSide,
    church_id: ChurchId,
    connection: &Connection,
) -> Result<Vec<EntryWithCategory>, Error> {
    connection
        .prepare(&format!(
            "SELECT e.id, e.church_id, e.category_id, e.amount, e.description,
                    e.payment_method, e.date, e.reserve_movement, e.created_by, e.created_at,
                    c.name
             FROM {table} e
             LEFT JOIN {category_table} c ON e.category_id = c.id
             WHERE e.church_id = :church_id
             ORDER BY e.date DESC, e.id DESC",
            table = side.entry_table(),
            category_table = side.category_table(),
        ))?
        .query_map(&[(":church_id", &church_id)], map_entry_with_category_row)?
        .map(|maybe_entry| maybe_entry.map_err(Error::SqlError))
        .collect()
}

/// Sum the amounts of all of a church's entries on one ledger side.
///
/// Deliberately unfiltered: reserve-fund-tagged entries are included, since
/// they are the mechanism that moves cash out of or into the operating
/// ledger.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn sum_entries(
    side: LedgerSide,
    church_id: ChurchId,
    connection: &Connection,
) -> Result<f64, Error> {
    connection
        .prepare(&format!(
            "SELECT COALESCE(SUM(amount), 0.0) FROM {table} WHERE church_id = :church_id",
            table = side.entry_table()
        ))?
        .query_one(&[(":church_id", &church_id)], |row| row.get(0))
        .map_err(|error| error.into())
}

/// Delete a ledger entry.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the entry does not exist for this church,
/// - [Error::ProtectedEntry] if the entry was written by a reserve fund
///   operation,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_entry(
    side: LedgerSide,
    id: EntryId,
    church_id: ChurchId,
    connection: &Connection,
) -> Result<(), Error> {
    let reserve_movement: bool = connection
        .prepare(&format!(
            "SELECT reserve_movement FROM {table} WHERE id = :id AND church_id = :church_id",
            table = side.entry_table()
        ))?
        .query_one(&[(":id", &id), (":church_id", &church_id)], |row| {
            row.get(0)
        })?;

    if reserve_movement {
        return Err(Error::ProtectedEntry);
    }

    connection.execute(
        &format!(
            "DELETE FROM {table} WHERE id = ?1 AND church_id = ?2",
            table = side.entry_table()
        ),
        (id, church_id),
    )?;

    Ok(())
}

fn map_entry_with_category_row(row: &Row) -> Result<EntryWithCategory, rusqlite::Error> {
    Ok(EntryWithCategory {
        entry: Entry {
            id: row.get(0)?,
            church_id: row.get(1)?,
            category_id: row.get(2)?,
            amount: row.get(3)?,
            description: row.get(4)?,
            payment_method: row.get(5)?,
            date: row.get(6)?,
            reserve_movement: row.get(7)?,
            created_by: row.get(8)?,
            created_at: row.get(9)?,
        },
        category_name: row.get(10)?,
    })
}

// ============================================================================
// ENDPOINTS
// ============================================================================

/// The form data for recording a manual ledger entry.
#[derive(Debug, Deserialize)]
pub struct EntryForm {
    /// The amount of money moved, in BRL.
    pub amount: f64,
    /// The calendar date when the movement happened.
    pub date: Date,
    /// How the movement was settled.
    pub payment_method: PaymentMethod,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Optional category ID.
    pub category_id: Option<CategoryId>,
}

async fn create_entry_for_side(
    side: LedgerSide,
    state: AppState,
    context: TenantContext,
    form: EntryForm,
) -> Result<impl IntoResponse, Error> {
    let today = today_in(&state.local_timezone)?;

    if form.date > today {
        tracing::warn!("rejected ledger entry dated in the future: {}", form.date);
        return Err(Error::FutureDate(form.date));
    }

    let builder = EntryBuilder::new(form.amount, form.date, form.payment_method)
        .description(form.description)
        .category_id(form.category_id);

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLock)?;

    let entry = create_entry(side, builder, &context, &connection)?;

    Ok((StatusCode::CREATED, Json(entry)))
}

async fn list_entries_for_side(
    side: LedgerSide,
    state: AppState,
    context: TenantContext,
) -> Result<impl IntoResponse, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLock)?;

    let entries = list_entries(side, context.church_id, &connection)?;

    Ok(Json(entries))
}

async fn delete_entry_for_side(
    side: LedgerSide,
    state: AppState,
    context: TenantContext,
    id: EntryId,
) -> Result<impl IntoResponse, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLock)?;

    delete_entry(side, id, context.church_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}

/// A route handler for recording a revenue entry.
pub async fn create_revenue_endpoint(
    State(state): State<AppState>,
    context: TenantContext,
    Json(form): Json<EntryForm>,
) -> Result<impl IntoResponse, Error> {
    create_entry_for_side(LedgerSide::Revenue, state, context, form).await
}

/// A route handler for recording an expense entry.
pub async fn create_expense_endpoint(
    State(state): State<AppState>,
    context: TenantContext,
    Json(form): Json<EntryForm>,
) -> Result<impl IntoResponse, Error> {
    create_entry_for_side(LedgerSide::Expense, state, context, form).await
}

/// A route handler for listing the church's revenue entries.
pub async fn list_revenues_endpoint(
    State(state): State<AppState>,
    context: TenantContext,
) -> Result<impl IntoResponse, Error> {
    list_entries_for_side(LedgerSide::Revenue, state, context).await
}

/// A route handler for listing the church's expense entries.
pub async fn list_expenses_endpoint(
    State(state): State<AppState>,
    context: TenantContext,
) -> Result<impl IntoResponse, Error> {
    list_entries_for_side(LedgerSide::Expense, state, context).await
}

/// A route handler for deleting a revenue entry.
pub async fn delete_revenue_endpoint(
    State(state): State<AppState>,
    context: TenantContext,
    Path(entry_id): Path<EntryId>,
) -> Result<impl IntoResponse, Error> {
    delete_entry_for_side(LedgerSide::Revenue, state, context, entry_id).await
}

/// A route handler for deleting an expense entry.
pub async fn delete_expense_endpoint(
    State(state): State<AppState>,
    context: TenantContext,
    Path(entry_id): Path<EntryId>,
) -> Result<impl IntoResponse, Error> {
    delete_entry_for_side(LedgerSide::Expense, state, context, entry_id).await
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        category::create_category, church::create_church, db::initialize, user::create_user,
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
    fn create_entry_succeeds() {
        let (conn, context) = get_test_connection_and_context();

        let entry = create_entry(
            LedgerSide::Revenue,
            EntryBuilder::new(150.0, date!(2026 - 07 - 12), PaymentMethod::Pix)
                .description(Some("Dízimo do culto de domingo".to_owned())),
            &context,
            &conn,
        )
        .unwrap();

        assert!(entry.id > 0);
        assert_eq!(entry.amount, 150.0);
        assert!(!entry.reserve_movement);
    }

    #[test]
    fn create_entry_rejects_non_positive_amount() {
        let (conn, context) = get_test_connection_and_context();

        for amount in [0.0, -10.0] {
            let result = create_entry(
                LedgerSide::Expense,
                EntryBuilder::new(amount, date!(2026 - 07 - 12), PaymentMethod::Cash),
                &context,
                &conn,
            );

            assert_eq!(result, Err(Error::InvalidAmount(amount)));
        }
    }

    #[test]
    fn create_entry_rejects_category_of_another_church() {
        let (conn, context) = get_test_connection_and_context();
        let other_church = create_church("Outra Igreja", &conn).unwrap();
        let other_category = create_category(
            LedgerSide::Expense,
            other_church.id,
            "Energia",
            None,
            None,
            &conn,
        )
        .unwrap();

        let result = create_entry(
            LedgerSide::Expense,
            EntryBuilder::new(80.0, date!(2026 - 07 - 12), PaymentMethod::Card)
                .category_id(Some(other_category.id)),
            &context,
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidCategory(Some(other_category.id))));
    }

    #[test]
    fn list_entries_returns_newest_first_with_category_name() {
        let (conn, context) = get_test_connection_and_context();
        let category = create_category(
            LedgerSide::Revenue,
            context.church_id,
            "Dízimos",
            None,
            None,
            &conn,
        )
        .unwrap();
        create_entry(
            LedgerSide::Revenue,
            EntryBuilder::new(100.0, date!(2026 - 07 - 01), PaymentMethod::Cash)
                .category_id(Some(category.id)),
            &context,
            &conn,
        )
        .unwrap();
        create_entry(
            LedgerSide::Revenue,
            EntryBuilder::new(200.0, date!(2026 - 07 - 15), PaymentMethod::Pix),
            &context,
            &conn,
        )
        .unwrap();

        let entries = list_entries(LedgerSide::Revenue, context.church_id, &conn).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].entry.amount, 200.0);
        assert_eq!(entries[0].category_name, None);
        assert_eq!(entries[1].category_name, Some("Dízimos".to_owned()));
    }

    #[test]
    fn sum_entries_includes_reserve_movements() {
        let (conn, context) = get_test_connection_and_context();
        create_entry(
            LedgerSide::Expense,
            EntryBuilder::new(100.0, date!(2026 - 07 - 01), PaymentMethod::Cash),
            &context,
            &conn,
        )
        .unwrap();
        create_entry(
            LedgerSide::Expense,
            EntryBuilder::new(50.0, date!(2026 - 07 - 02), PaymentMethod::Cash)
                .reserve_movement(true),
            &context,
            &conn,
        )
        .unwrap();

        let total = sum_entries(LedgerSide::Expense, context.church_id, &conn).unwrap();

        assert_eq!(total, 150.0);
    }

    #[test]
    fn delete_entry_removes_ordinary_entry() {
        let (conn, context) = get_test_connection_and_context();
        let entry = create_entry(
            LedgerSide::Expense,
            EntryBuilder::new(75.0, date!(2026 - 07 - 10), PaymentMethod::Card),
            &context,
            &conn,
        )
        .unwrap();

        delete_entry(LedgerSide::Expense, entry.id, context.church_id, &conn).unwrap();

        let entries = list_entries(LedgerSide::Expense, context.church_id, &conn).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn delete_entry_refuses_reserve_movement() {
        let (conn, context) = get_test_connection_and_context();
        let entry = create_entry(
            LedgerSide::Expense,
            EntryBuilder::new(300.0, date!(2026 - 07 - 10), PaymentMethod::Cash)
                .reserve_movement(true),
            &context,
            &conn,
        )
        .unwrap();

        let result = delete_entry(LedgerSide::Expense, entry.id, context.church_id, &conn);

        assert_eq!(result, Err(Error::ProtectedEntry));
        let entries = list_entries(LedgerSide::Expense, context.church_id, &conn).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn delete_entry_fails_for_other_churches_entry() {
        let (conn, context) = get_test_connection_and_context();
        let entry = create_entry(
            LedgerSide::Revenue,
            EntryBuilder::new(75.0, date!(2026 - 07 - 10), PaymentMethod::Card),
            &context,
            &conn,
        )
        .unwrap();
        let other_church = create_church("Outra Igreja", &conn).unwrap();

        let result = delete_entry(LedgerSide::Revenue, entry.id, other_church.id, &conn);

        assert_eq!(result, Err(Error::NotFound));
    }
}
