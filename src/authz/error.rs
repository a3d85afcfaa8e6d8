//! Authorization errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthzError {
    /// The caller's role does not grant this controller action. Carries the
    /// controller and action for diagnostics, nothing more.
    #[error("insufficient permissions to execute {controller}:{action}")]
    PermissionDenied { controller: String, action: String },
}

impl AuthzError {
    pub fn denied(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Self::PermissionDenied {
            controller: controller.into(),
            action: action.into(),
        }
    }
}
