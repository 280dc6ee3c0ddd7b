use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::repository::RepoError;

/// ApiError
///
/// The domain-level failure taxonomy shared by every handler. Each variant maps to
/// exactly one HTTP status, so a handler expresses its contract by returning the
/// matching variant and never touches status codes directly.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed, missing, or out-of-range input.
    #[error("Bad Request: {0}")]
    BadRequest(String),

    /// Missing or unrecognized session token.
    #[error("Unauthorized")]
    Unauthorized,

    /// Valid identity, but the caller does not own the resource (or the action is
    /// otherwise not permitted for them).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// No entity matches the requested id.
    #[error("Not Found")]
    NotFound,

    /// Store, filesystem, or programming errors. The detail is logged, not leaked.
    #[error("internal error: {0}")]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, format!("Bad Request: {msg}")).into_response()
            }
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            ApiError::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, format!("Forbidden: {msg}")).into_response()
            }
            ApiError::NotFound => StatusCode::NOT_FOUND.into_response(),
            ApiError::Internal(err) => {
                tracing::error!("unexpected failure: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    }
}

// Handlers that care about `RepoError::Conflict` intercept it before this conversion
// runs; anything that reaches here is an unexpected store failure.
impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        ApiError::Internal(Box::new(err))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Internal(Box::new(err))
    }
}
