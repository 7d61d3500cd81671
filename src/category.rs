//! Tenant-scoped categories for the two sides of the operating ledger.
//!
//! Revenue and expense categories live in separate namespaces. One name is
//! reserved per side: [RESERVE_CATEGORY_NAME], which tags the synthetic
//! ledger entries written by reserve fund operations. The reserved
//! category is created lazily on the first reserve fund operation.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    church::TenantContext,
    database_id::{CategoryId, ChurchId},
    side::LedgerSide,
};

/// The sentinel category name used to tag synthetic ledger entries created
/// by reserve fund operations.
pub const RESERVE_CATEGORY_NAME: &str = "Fundo de Reserva";

/// A label for grouping ledger entries, e.g. "Dízimos", "Energia elétrica".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The church the category belongs to.
    pub church_id: ChurchId,
    /// The category's display name, unique per church and side.
    pub name: String,
    /// An optional longer description.
    pub description: Option<String>,
    /// An optional display color, e.g. "#0EA5E9".
    pub color: Option<String>,
}

/// Create a category table for one ledger side.
///
/// The unique index on (church_id, name) is what makes the reserved
/// category's insert-if-absent semantics safe under concurrent first use.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_category_table(
    side: LedgerSide,
    connection: &Connection,
) -> Result<(), rusqlite::Error> {
    connection.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                church_id INTEGER NOT NULL,
                name TEXT NOT NULL COLLATE NOCASE,
                description TEXT,
                color TEXT,
                UNIQUE(church_id, name),
                FOREIGN KEY(church_id) REFERENCES church(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
            table = side.category_table()
        ),
        (),
    )?;

    Ok(())
}

/// Create a new category.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateCategoryName] if the church already has a category
///   with this name (names compare case-insensitively),
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_category(
    side: LedgerSide,
    church_id: ChurchId,
    name: &str,
    description: Option<&str>,
    color: Option<&str>,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(&format!(
            "INSERT INTO {table} (church_id, name, description, color) VALUES (?1, ?2, ?3, ?4)",
            table = side.category_table()
        ))?
        .execute((church_id, name, description, color))
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(sql_error, Some(_))
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Error::DuplicateCategoryName(name.to_owned())
            }
            error => error.into(),
        })?;

    Ok(Category {
        id: connection.last_insert_rowid(),
        church_id,
        name: name.to_owned(),
        description: description.map(str::to_owned),
        color: color.map(str::to_owned),
    })
}

/// Retrieve a category by its ID, scoped to a church.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the ID does not refer to a category owned by the
///   church,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_category(
    side: LedgerSide,
    id: CategoryId,
    church_id: ChurchId,
    connection: &Connection,
) -> Result<Category, Error> {
    let category = connection
        .prepare(&format!(
            "SELECT id, church_id, name, description, color FROM {table}
             WHERE id = :id AND church_id = :church_id",
            table = side.category_table()
        ))?
        .query_one(&[(":id", &id), (":church_id", &church_id)], map_category_row)?;

    Ok(category)
}

/// Retrieve all of a church's categories for one ledger side.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn list_categories(
    side: LedgerSide,
    church_id: ChurchId,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    connection
        .prepare(&format!(
            "SELECT id, church_id, name, description, color FROM {table}
             WHERE church_id = :church_id ORDER BY name",
            table = side.category_table()
        ))?
        .query_map(&[(":church_id", &church_id)], map_category_row)?
        .map(|maybe_category| maybe_category.map_err(Error::SqlError))
        .collect()
}

/// Get the church's reserved "Fundo de Reserva" category for one side,
/// creating it if it does not exist yet.
///
/// Uses insert-if-absent against the unique (church_id, name) index, so
/// two concurrent first-time reserve operations cannot create duplicates.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn get_or_create_reserve_category(
    side: LedgerSide,
    church_id: ChurchId,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(&format!(
            "INSERT OR IGNORE INTO {table} (church_id, name, description, color)
             VALUES (?1, ?2, ?3, ?4)",
            table = side.category_table()
        ))?
        .execute((
            church_id,
            RESERVE_CATEGORY_NAME,
            "Movimentações do fundo de reserva",
            "#0EA5E9",
        ))?;

    let category = connection
        .prepare(&format!(
            "SELECT id, church_id, name, description, color FROM {table}
             WHERE church_id = ?1 AND name = ?2",
            table = side.category_table()
        ))?
        .query_one((church_id, RESERVE_CATEGORY_NAME), map_category_row)?;

    Ok(category)
}

fn map_category_row(row: &Row) -> Result<Category, rusqlite::Error> {
    Ok(Category {
        id: row.get(0)?,
        church_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        color: row.get(4)?,
    })
}

// ============================================================================
// ENDPOINTS
// ============================================================================

/// The form data for creating a category.
#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    /// The category's display name.
    pub name: String,
    /// An optional longer description.
    pub description: Option<String>,
    /// An optional display color.
    pub color: Option<String>,
}

async fn create_category_for_side(
    side: LedgerSide,
    state: AppState,
    context: TenantContext,
    form: CategoryForm,
) -> Result<impl IntoResponse, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLock)?;

    let category = create_category(
        side,
        context.church_id,
        &form.name,
        form.description.as_deref(),
        form.color.as_deref(),
        &connection,
    )?;

    Ok((StatusCode::CREATED, Json(category)))
}

async fn list_categories_for_side(
    side: LedgerSide,
    state: AppState,
    context: TenantContext,
) -> Result<impl IntoResponse, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLock)?;

    let categories = list_categories(side, context.church_id, &connection)?;

    Ok(Json(categories))
}

/// A route handler for creating a revenue category.
pub async fn create_revenue_category_endpoint(
    State(state): State<AppState>,
    context: TenantContext,
    Json(form): Json<CategoryForm>,
) -> Result<impl IntoResponse, Error> {
    create_category_for_side(LedgerSide::Revenue, state, context, form).await
}

/// A route handler for creating an expense category.
pub async fn create_expense_category_endpoint(
    State(state): State<AppState>,
    context: TenantContext,
    Json(form): Json<CategoryForm>,
) -> Result<impl IntoResponse, Error> {
    create_category_for_side(LedgerSide::Expense, state, context, form).await
}

/// A route handler for listing the church's revenue categories.
pub async fn list_revenue_categories_endpoint(
    State(state): State<AppState>,
    context: TenantContext,
) -> Result<impl IntoResponse, Error> {
    list_categories_for_side(LedgerSide::Revenue, state, context).await
}

/// A route handler for listing the church's expense categories.
pub async fn list_expense_categories_endpoint(
    State(state): State<AppState>,
    context: TenantContext,
) -> Result<impl IntoResponse, Error> {
    list_categories_for_side(LedgerSide::Expense, state, context).await
}

// ============================================================================
// TESTS
// ============================================================================
