//! Treasurer accounts and sign-up.
//!
//! Registering a treasurer creates the user *and* its church in one
//! database transaction, since the church is the tenant root that every
//! other row hangs off.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    church::create_church,
    database_id::{ChurchId, UserId},
};

/// A registered treasurer account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    /// The ID of the user.
    pub id: UserId,
    /// The user's email address, unique across all tenants.
    pub email: String,
    /// The church the user belongs to.
    pub church_id: ChurchId,
    /// The bcrypt hash of the user's password. Never serialized.
    #[serde(skip_serializing)]
    pub password_hash: String,
}

/// Create the user table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                church_id INTEGER NOT NULL,
                FOREIGN KEY(church_id) REFERENCES church(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Create a new user belonging to `church_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateEmail] if the email is already registered,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_user(
    email: &str,
    password_hash: &str,
    church_id: ChurchId,
    connection: &Connection,
) -> Result<User, Error> {
    connection
        .prepare("INSERT INTO user (email, password_hash, church_id) VALUES (?1, ?2, ?3)")?
        .execute((email, password_hash, church_id))
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    && desc.contains("email") =>
            {
                Error::DuplicateEmail
            }
            error => error.into(),
        })?;

    Ok(User {
        id: connection.last_insert_rowid(),
        email: email.to_owned(),
        church_id,
        password_hash: password_hash.to_owned(),
    })
}

/// Retrieve a user by their email address.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if no user has that email,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    let user = connection
        .prepare("SELECT id, email, church_id, password_hash FROM user WHERE email = :email")?
        .query_one(&[(":email", &email)], |row| {
            Ok(User {
                id: row.get(0)?,
                email: row.get(1)?,
                church_id: row.get(2)?,
                password_hash: row.get(3)?,
            })
        })?;

    Ok(user)
}

/// The form data for registering a treasurer and their church.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    /// The display name of the church to create.
    pub church_name: String,
    /// The email address for the new account.
    pub email: String,
    /// The plain-text password for the new account.
    pub password: String,
}

/// A route handler for registering a treasurer.
///
/// Creates the church and the user in a single transaction so a failed
/// user insert cannot leave an orphan church behind.
pub async fn register_endpoint(
    State(state): State<AppState>,
    Json(form): Json<RegisterForm>,
) -> Result<impl IntoResponse, Error> {
    let password_hash = bcrypt::hash(&form.password, bcrypt::DEFAULT_COST)
        .map_err(|error| Error::HashingError(error.to_string()))?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLock)?;
    let transaction =
        SqlTransaction::new_unchecked(&connection, TransactionBehavior::Immediate)?;

    let church = create_church(&form.church_name, &transaction)?;
    let user = create_user(&form.email, &password_hash, church.id, &transaction)?;

    transaction.commit()?;

    Ok((StatusCode::CREATED, Json(user)))
}
