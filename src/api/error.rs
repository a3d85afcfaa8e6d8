//! The wire-facing error taxonomy.
//!
//! Everything the funnel or a controller can fail with converges here; the
//! transport layer maps each kind to a status code. Startup-fatal errors
//! (`DuplicateRoute`, `InvalidHandler`) never reach this type; they abort
//! process initialization instead.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;
use crate::authz::AuthzError;
use crate::routing::RoutingError;
use crate::services::RepositoryError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The process is draining; the caller should retry elsewhere/later.
    #[error("backend is shutting down")]
    ShuttingDown,

    #[error("URL not found: {verb} {path}")]
    RouteNotFound { verb: String, path: String },

    #[error("too many requests for {controller}:{action}")]
    RateLimited { controller: String, action: String },

    #[error("invalid authentication token")]
    InvalidToken,

    #[error("authentication token has expired")]
    ExpiredToken,

    /// The token references a user that no longer exists.
    #[error("user not found")]
    UserNotFound,

    /// Denied by the permission table. Carries controller and action for
    /// diagnostics; deliberately nothing about the resource itself.
    #[error("insufficient permissions to execute {controller}:{action}")]
    PermissionDenied { controller: String, action: String },

    #[error("not authenticated")]
    NotAuthenticated,

    /// Authenticated, but acting on a resource the caller does not own.
    #[error("{0}")]
    Forbidden(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Stable machine-readable code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::ShuttingDown => "shutting_down",
            ApiError::RouteNotFound { .. } => "url_not_found",
            ApiError::RateLimited { .. } => "rate_limited",
            ApiError::InvalidToken => "invalid_token",
            ApiError::ExpiredToken => "expired_token",
            ApiError::UserNotFound => "user_not_found",
            ApiError::PermissionDenied { .. } => "permission_denied",
            ApiError::NotAuthenticated => "not_authenticated",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::RouteNotFound { .. } | ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InvalidToken
            | ApiError::ExpiredToken
            | ApiError::UserNotFound
            | ApiError::NotAuthenticated
            | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::PermissionDenied { .. } | ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message: self.to_string(),
            },
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<RoutingError> for ApiError {
    fn from(err: RoutingError) -> Self {
        match err {
            RoutingError::NotFound { verb, path } => ApiError::RouteNotFound { verb, path },
            // Registration errors are startup-fatal and should never show
            // up at request time.
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken => ApiError::InvalidToken,
            AuthError::ExpiredToken => ApiError::ExpiredToken,
            AuthError::UserNotFound(_) => ApiError::UserNotFound,
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::NotAuthenticated => ApiError::NotAuthenticated,
            AuthError::TokenCreation => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        let AuthzError::PermissionDenied { controller, action } = err;
        ApiError::PermissionDenied { controller, action }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UsernameTaken | RepositoryError::EmailTaken => {
                ApiError::Conflict(err.to_string())
            }
            RepositoryError::TeamExists(_) => ApiError::Conflict(err.to_string()),
            RepositoryError::UserNotFound(_) => ApiError::NotFound(err.to_string()),
        }
    }
}
