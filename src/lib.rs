//! Tesouraria is a multi-tenant treasury service for church finances.
//!
//! Treasurers record revenues (tithes, offerings) and expenses in an
//! operating ledger, and move money into a per-church reserve fund through
//! deposit, withdrawal and monthly auto-transfer operations. The library
//! provides a JSON REST API over SQLite.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use time::Date;
use tokio::signal;

pub mod app_state;
pub mod auth;
pub mod balance;
pub mod category;
pub mod church;
pub mod database_id;
pub mod db;
pub mod endpoints;
pub mod entry;
pub mod logging;
pub mod report;
pub mod reserve_fund;
pub mod routing;
pub mod side;
pub mod timezone;
pub mod user;

pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use logging::logging_middleware;
pub use routing::build_router;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A zero or negative amount was given for a money movement.
    #[error("the amount must be greater than zero, got {0}")]
    InvalidAmount(f64),

    /// The user provided an invalid email and password combination.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The request is missing a valid bearer token.
    #[error("not authenticated")]
    Unauthenticated,

    /// The authenticated user could not be resolved to a church.
    #[error("no church is associated with the authenticated user")]
    TenantResolution,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the
    /// parameters (e.g., ID) are correct and that the resource has been
    /// created. Internally, this error may occur when a query returns no
    /// rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// A deposit was requested for more money than the operating ledger
    /// holds. The current available balance is carried so the client can
    /// show it to the user.
    #[error("insufficient funds: the available balance is {available:.2}")]
    InsufficientOperatingBalance {
        /// The available balance at the time the deposit was rejected.
        available: f64,
    },

    /// A withdrawal was requested for more money than the reserve fund
    /// holds.
    #[error("insufficient funds: the reserve fund balance is {balance:.2}")]
    InsufficientReserveBalance {
        /// The fund balance at the time the withdrawal was rejected.
        balance: f64,
    },

    /// A date in the future was used to create a ledger entry.
    ///
    /// Ledger entries record events that have already happened, therefore
    /// future dates are not allowed.
    #[error("{0} is a date in the future, which is not allowed")]
    FutureDate(Date),

    /// An auto-transfer was already performed this calendar month.
    #[error("an automatic transfer was already performed this month (last transfer: {0})")]
    AlreadyTransferred(Date),

    /// An auto-transfer found no positive available balance to move.
    #[error("there is no available balance to transfer")]
    NothingToTransfer,

    /// Tried to delete a ledger entry created by a reserve fund operation.
    ///
    /// Deleting one side of a transfer would desynchronise the operating
    /// ledger and the reserve ledger, so the server refuses.
    #[error("this entry mirrors a reserve fund movement and cannot be deleted")]
    ProtectedEntry,

    /// The email used to register already belongs to a user.
    #[error("the email address is already registered")]
    DuplicateEmail,

    /// The category name already exists for this church.
    #[error("the category \"{0}\" already exists")]
    DuplicateCategoryName(String),

    /// The category ID used to create a ledger entry did not match a
    /// category belonging to the church.
    #[error("the category ID does not refer to a valid category")]
    InvalidCategory(Option<database_id::CategoryId>),

    /// An error occurred while getting the local offset from a canonical
    /// timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),

    /// An unexpected error occurred with the password hashing library.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// A session token could not be created.
    #[error("could not create a session token")]
    TokenCreation,

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLock,

    /// An unhandled/unexpected SQL error. The raw message is surfaced for
    /// operator diagnosis.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {error}");
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self {
            Error::InvalidAmount(_) | Error::InvalidCategory(_) | Error::FutureDate(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::InvalidCredentials | Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::TenantResolution => StatusCode::FORBIDDEN,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::InsufficientOperatingBalance { .. }
            | Error::InsufficientReserveBalance { .. }
            | Error::NothingToTransfer => StatusCode::UNPROCESSABLE_ENTITY,
            Error::AlreadyTransferred(_)
            | Error::ProtectedEntry
            | Error::DuplicateEmail
            | Error::DuplicateCategoryName(_) => StatusCode::CONFLICT,
            Error::InvalidTimezone(_)
            | Error::HashingError(_)
            | Error::TokenCreation
            | Error::DatabaseLock
            | Error::SqlError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("an internal error occurred: {self}");
        }

        let body = Json(json!({ "error": self.to_string() }));

        (status, body).into_response()
    }
}

/// An async task that waits for either the ctrl+c or terminate signal,
/// whichever comes first, and then signals the server to shut down
/// gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}
