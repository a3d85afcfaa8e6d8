//! The resolved caller of one request.

use crate::authz::ANONYMOUS_ROLE;

use super::AuthError;

/// Resolved fresh at the start of every request from the presented
/// credential, discarded when the request completes. Never cached.
#[derive(Debug, Clone, Default)]
pub enum Identity {
    /// No credential was presented.
    #[default]
    Anonymous,
    /// A known user with their current role.
    User { id: i64, role: String },
}

impl Identity {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }

    /// The role the permission check runs against.
    pub fn role(&self) -> &str {
        match self {
            Identity::Anonymous => ANONYMOUS_ROLE,
            Identity::User { role, .. } => role,
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        match self {
            Identity::Anonymous => None,
            Identity::User { id, .. } => Some(*id),
        }
    }

    /// The user id, or `NotAuthenticated` for anonymous callers. Used by
    /// the `_me` controller actions.
    pub fn require_user_id(&self) -> Result<i64, AuthError> {
        self.user_id().ok_or(AuthError::NotAuthenticated)
    }
}
