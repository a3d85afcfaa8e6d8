//! Authentication errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// The credential is malformed, forged, or was revoked. A *missing*
    /// credential is not an error; it resolves to the anonymous identity.
    #[error("invalid authentication token")]
    InvalidToken,

    /// The credential was once valid but its lifetime is over.
    #[error("authentication token has expired")]
    ExpiredToken,

    /// The token references a user that no longer exists (deleted between
    /// token issuance and use).
    #[error("user {0} not found")]
    UserNotFound(i64),

    /// Login failed. Deliberately does not say whether the username exists.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The action requires an authenticated caller.
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("token creation failed")]
    TokenCreation,
}
