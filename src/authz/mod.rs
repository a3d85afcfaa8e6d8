//! Role-based access control.
//!
//! Permissions are a nested role -> resource -> action -> allow map loaded
//! from configuration at startup and read-only afterwards. The `*` key
//! means "any resource" or "any action" at its level.

mod error;
mod permissions;

pub use error::AuthzError;
pub use permissions::{ANONYMOUS_ROLE, PermissionTable, WILDCARD};
