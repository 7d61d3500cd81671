//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{DecodingKey, EncodingKey};
use rusqlite::Connection;

use crate::{Error, db::initialize};

/// The keys used for signing and verifying session tokens.
#[derive(Clone)]
pub struct JwtKeys {
    /// The key for signing new tokens.
    pub encoding_key: EncodingKey,
    /// The key for verifying presented tokens.
    pub decoding_key: DecodingKey,
}

impl JwtKeys {
    /// Derive both keys from a shared secret.
    pub fn from_secret(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
        }
    }
}

/// The state of the REST server.
#[derive(Clone)]
pub struct AppState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,

    /// The keys for signing and verifying session tokens.
    pub jwt_keys: JwtKeys,

    /// The shared secret expected from the external scheduler that triggers
    /// monthly auto-transfers. When `None`, the trigger endpoint is open.
    pub transfer_secret: Option<String>,

    /// The local timezone as a canonical timezone name, e.g.
    /// "America/Sao_Paulo".
    pub local_timezone: String,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for
    /// the domain models. `local_timezone` should be a valid, canonical
    /// timezone name.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        jwt_secret: &str,
        transfer_secret: Option<String>,
        local_timezone: &str,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            db_connection: Arc::new(Mutex::new(db_connection)),
            jwt_keys: JwtKeys::from_secret(jwt_secret),
            transfer_secret,
            local_timezone: local_timezone.to_owned(),
        })
    }
}

impl<S> FromRequestParts<S> for AppState
where
    Self: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(_: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_ref(state))
    }
}
