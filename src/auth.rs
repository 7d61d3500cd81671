//! Bearer token authentication for the JSON API.
//!
//! Sign-in exchanges an email and password for a short-lived JWT. Handlers
//! that need the caller's identity take a [Claims] extractor argument;
//! handlers that need the tenant scope take
//! [crate::church::TenantContext], which builds on [Claims].

use axum::{
    Json,
    RequestPartsExt,
    extract::{FromRef, FromRequestParts, State},
    http::request::Parts,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{AppState, Error, database_id::UserId, user::get_user_by_email};

/// How long a session token remains valid after being issued.
const TOKEN_DURATION: Duration = Duration::hours(8);

/// The contents of a session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The expiry time of the token as a unix timestamp.
    pub exp: usize,
    /// The time the token was issued as a unix timestamp.
    pub iat: usize,
    /// The ID of the user the token was issued to.
    pub sub: UserId,
}

impl<S> FromRequestParts<S> for Claims
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| Error::Unauthenticated)?;

        let state = AppState::from_ref(state);
        let token_data = decode_jwt(bearer.token(), &state.jwt_keys.decoding_key)?;

        Ok(token_data.claims)
    }
}

/// The credentials entered during sign-in.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    /// Email entered during sign-in.
    pub email: String,
    /// Password entered during sign-in.
    pub password: String,
}

/// Handler for sign-in requests. Returns a bearer token as a JSON string.
///
/// # Errors
/// This function will return an [Error::InvalidCredentials] if the email
/// does not belong to a registered user or the password does not match.
pub async fn sign_in(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<String>, Error> {
    let user = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLock)?;

        get_user_by_email(&credentials.email, &connection).map_err(|error| match error {
            Error::NotFound => Error::InvalidCredentials,
            error => error,
        })?
    };

    let password_is_correct = bcrypt::verify(&credentials.password, &user.password_hash)
        .map_err(|error| Error::HashingError(error.to_string()))?;

    if !password_is_correct {
        return Err(Error::InvalidCredentials);
    }

    let token = encode_jwt(user.id, &state.jwt_keys.encoding_key)?;

    Ok(Json(token))
}

fn encode_jwt(user_id: UserId, encoding_key: &EncodingKey) -> Result<String, Error> {
    let now = OffsetDateTime::now_utc();
    let claims = Claims {
        exp: (now + TOKEN_DURATION).unix_timestamp() as usize,
        iat: now.unix_timestamp() as usize,
        sub: user_id,
    };

    encode(&Header::default(), &claims, encoding_key).map_err(|_| Error::TokenCreation)
}

fn decode_jwt(token: &str, decoding_key: &DecodingKey) -> Result<TokenData<Claims>, Error> {
    decode(token, decoding_key, &Validation::default()).map_err(|_| Error::Unauthenticated)
}

#[cfg(test)]
mod tests {
    use crate::app_state::JwtKeys;

    use super::*;

    #[test]
    fn decode_jwt_gives_back_user_id() {
        let keys = JwtKeys::from_secret("foobar");

        let token = encode_jwt(42, &keys.encoding_key).unwrap();
        let claims = decode_jwt(&token, &keys.decoding_key).unwrap().claims;

        assert_eq!(claims.sub, 42);
    }

    #[test]
    fn decode_jwt_rejects_token_signed_with_other_key() {
        let keys = JwtKeys::from_secret("foobar");
        let other_keys = JwtKeys::from_secret("not foobar");

        let token = encode_jwt(42, &keys.encoding_key).unwrap();
        let result = decode_jwt(&token, &other_keys.decoding_key);

        assert!(matches!(result, Err(Error::Unauthenticated)));
    }
}
