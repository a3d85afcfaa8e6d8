//! API controllers.
//!
//! Each controller declares its routes as data and exposes a handler table
//! keyed by action name. The funnel walks the declarations at startup,
//! asks for each handler and attaches it to the router; a declared action
//! with no handler aborts startup. There is no runtime reflection: the
//! table is built once and validated for completeness before the listener
//! accepts connections.

mod auth;
mod clock;
mod security;
mod team;
mod working_time;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub use auth::AuthController;
pub use clock::ClockController;
use once_cell::sync::Lazy;
use regex::Regex;
pub use security::SecurityController;
use serde_json::Value;
pub use team::TeamController;
pub use working_time::WorkingTimeController;

use crate::api::{ApiError, RequestContext};

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, ApiError>> + Send>>;

/// An invokable reference to one controller action.
pub type ActionHandler = Arc<dyn Fn(RequestContext) -> HandlerFuture + Send + Sync>;

/// A declared route, relative to the controller prefix.
#[derive(Debug, Clone, Copy)]
pub struct ActionRoute {
    pub verb: &'static str,
    pub path: &'static str,
    pub action: &'static str,
}

pub trait Controller: Send + Sync {
    /// Controller name; also the resource name in the permission table and
    /// the first path segment after `/api`.
    fn name(&self) -> &'static str;

    /// Routes to register for this controller.
    fn routes(&self) -> &'static [ActionRoute];

    /// Look up the handler for an action. `None` means the declaration and
    /// the implementation disagree, which is fatal at startup.
    fn handler(self: Arc<Self>, action: &str) -> Option<ActionHandler>;
}

/// Builds the action-name -> handler match for a controller, wrapping each
/// method into an [`ActionHandler`] that owns its controller.
macro_rules! dispatch {
    ($self:ident, $action:ident, { $($name:literal => $method:ident),+ $(,)? }) => {
        match $action {
            $(
                $name => {
                    let controller = ::std::sync::Arc::clone(&$self);
                    let handler: $crate::controllers::ActionHandler =
                        ::std::sync::Arc::new(move |ctx| {
                            let controller = ::std::sync::Arc::clone(&controller);
                            Box::pin(async move { controller.$method(ctx).await })
                        });
                    Some(handler)
                }
            )+
            _ => None,
        }
    };
}
pub(crate) use dispatch;

pub(crate) static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+(\.[A-Za-z0-9_-]+)*@[A-Za-z0-9_-]+(\.[A-Za-z0-9_-]+)*\.[A-Za-z0-9_-]+$")
        .expect("email pattern must compile")
});

pub(crate) fn validate_email(email: &str) -> Result<(), ApiError> {
    if EMAIL_PATTERN.is_match(email) {
        Ok(())
    } else {
        Err(ApiError::bad_request("invalid email format"))
    }
}

pub(crate) fn validate_username(username: &str, min_length: usize) -> Result<(), ApiError> {
    if username.len() < min_length {
        return Err(ApiError::bad_request(format!(
            "username must be at least {min_length} characters"
        )));
    }
    Ok(())
}

pub(crate) fn validate_password(
    password: &str,
    rules: &crate::config::PasswordRules,
) -> Result<(), ApiError> {
    if password.len() < rules.min_length {
        return Err(ApiError::bad_request(format!(
            "password must be at least {} characters",
            rules.min_length
        )));
    }
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_upper && has_lower && has_digit) {
        return Err(ApiError::bad_request(
            "password must mix uppercase, lowercase and digits",
        ));
    }
    Ok(())
}
