use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
};
use rand::{Rng, distributions::Alphanumeric};

use crate::{models::User, repository::RepositoryState};

/// Custom request header carrying the opaque session token.
pub const AUTH_HEADER: &str = "x-authorization";

/// Length of a minted session token.
const TOKEN_LENGTH: usize = 32;

/// Mints a fresh opaque session token: fixed-length alphanumeric, drawn from a
/// uniform random source. Valid until logout clears it or a new login overwrites it.
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Hashes a raw password with a per-password random salt.
pub fn hash_password(raw: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(raw.as_bytes(), &salt)?
        .to_string())
}

/// Verifies a raw password against a stored hash. A malformed stored hash counts
/// as a failed verification rather than an error; either way the caller responds
/// with the uniform invalid-credentials signal.
pub fn verify_password(raw: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(raw.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Extracting it reads the
/// `X-Authorization` header and resolves the token through the repository; any
/// failure rejects the request with 401 before the handler runs.
///
/// Handlers that must check resource existence *before* authentication (the
/// 404-before-401 contract on entity-scoped endpoints) use `MaybeAuthUser` instead.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match MaybeAuthUser::from_request_parts(parts, state).await? {
            MaybeAuthUser(Some(user)) => Ok(AuthUser(user)),
            MaybeAuthUser(None) => Err(StatusCode::UNAUTHORIZED),
        }
    }
}

/// MaybeAuthUser
///
/// Non-rejecting variant of `AuthUser`: `None` covers both a missing header and a
/// token that resolves to no user. Only a store failure rejects (500).
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<User>);

impl MaybeAuthUser {
    /// The resolved user, when authenticated.
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);

        let Some(token) = parts
            .headers
            .get(AUTH_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|token| !token.is_empty())
        else {
            return Ok(MaybeAuthUser(None));
        };

        let user = repo.user_by_token(token).await.map_err(|err| {
            tracing::error!("token lookup failed: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

        Ok(MaybeAuthUser(user))
    }
}
