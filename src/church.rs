//! The church is the tenant root: every ledger row is scoped to one.
//!
//! Handlers never look the tenant up ad hoc. They take a [TenantContext]
//! extractor argument, which authenticates the request and resolves the
//! user to exactly one church before the handler body runs.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::Claims,
    database_id::{ChurchId, UserId},
};

/// A church, the root of multi-tenancy. Created at sign-up, never deleted.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Church {
    /// The ID of the church.
    pub id: ChurchId,
    /// The church's display name.
    pub name: String,
}

/// Create the church table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_church_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS church (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Create a new church.
///
/// # Errors
/// Returns an [Error::SqlError] if the insert fails.
pub fn create_church(name: &str, connection: &Connection) -> Result<Church, Error> {
    let church = connection
        .prepare("INSERT INTO church (name) VALUES (?1) RETURNING id, name")?
        .query_one((name,), |row| {
            Ok(Church {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

    Ok(church)
}

/// The resolved tenant scope for one authenticated request.
///
/// Every core operation takes this value explicitly instead of re-deriving
/// the current tenant from session state, which keeps the operations
/// trivially testable with a fixed context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext {
    /// The church all reads and writes must be scoped to.
    pub church_id: ChurchId,
    /// The authenticated user performing the operation.
    pub user_id: UserId,
}

/// Resolve an authenticated user to their church.
///
/// # Errors
/// Returns [Error::TenantResolution] if the user does not exist or has no
/// church associated.
pub fn resolve_tenant(user_id: UserId, connection: &Connection) -> Result<TenantContext, Error> {
    let church_id = connection
        .prepare("SELECT church_id FROM user WHERE id = :id")?
        .query_one(&[(":id", &user_id)], |row| row.get::<_, ChurchId>(0))
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::TenantResolution,
            error => error.into(),
        })?;

    Ok(TenantContext { church_id, user_id })
}

impl<S> FromRequestParts<S> for TenantContext
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let claims = Claims::from_request_parts(parts, state).await?;
        let state = AppState::from_ref(state);

        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLock)?;

        resolve_tenant(claims.sub, &connection)
    }
}
