//! Authentication: identities, JWT tokens and password hashing.

mod error;
mod identity;
pub mod token;
pub mod vault;

pub use error::AuthError;
pub use identity::Identity;
pub use token::{IssuedToken, TokenService, TokenVerifier, VerifiedToken};
pub use vault::Vault;
