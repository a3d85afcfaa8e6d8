//! Account self-service: login, logout, registration and the `_me` user
//! operations.

use std::sync::Arc;

use chrono::Duration;
use serde_json::{Value, json};

use crate::api::{ApiError, RequestContext};
use crate::auth::{TokenService, TokenVerifier};
use crate::config::{AuthConfig, PasswordRules, UsernameRules};
use crate::services::{NewUser, UserRepository, UserUpdate};

use super::{
    ActionHandler, ActionRoute, Controller, dispatch, validate_email, validate_password,
    validate_username,
};

const ROUTES: &[ActionRoute] = &[
    ActionRoute { verb: "post", path: "/_login", action: "login" },
    ActionRoute { verb: "get", path: "/_logout", action: "logout" },
    ActionRoute { verb: "post", path: "/_register", action: "register" },
    ActionRoute { verb: "post", path: "/_checkToken", action: "checkToken" },
    ActionRoute { verb: "get", path: "/_me", action: "getMyUser" },
    ActionRoute { verb: "put", path: "/", action: "updateMyUser" },
    ActionRoute { verb: "delete", path: "/", action: "deleteMyUser" },
];

pub struct AuthController {
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenService>,
    username_rules: UsernameRules,
    password_rules: PasswordRules,
}

impl AuthController {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<TokenService>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            users,
            tokens,
            username_rules: config.username.clone(),
            password_rules: config.password.clone(),
        }
    }

    /// Requested token lifetime, from the `expiresIn` argument in seconds.
    /// `None` falls back to the configured default.
    fn requested_ttl(ctx: &RequestContext) -> Result<Option<Duration>, ApiError> {
        match ctx.arg("expiresIn") {
            None => Ok(None),
            Some(raw) => {
                let secs: i64 = raw
                    .parse()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or_else(|| {
                        ApiError::bad_request("expiresIn must be a positive number of seconds")
                    })?;
                Ok(Some(Duration::seconds(secs)))
            }
        }
    }

    async fn login(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let username = ctx.body_str("username")?.to_lowercase();
        let password = ctx.body_str("password")?;
        let ttl = Self::requested_ttl(&ctx)?;

        // Single failure mode on purpose: the caller must not learn
        // whether the username or the password was wrong.
        let user = self
            .users
            .verify(&username, password)
            .await
            .ok_or(ApiError::InvalidCredentials)?;

        let token = self.tokens.issue(user.id, ttl)?;

        Ok(json!({
            "id": token.user_id,
            "jwt": token.jwt,
            "ttl": token.ttl_ms,
            "expiresAt": token.expires_at_ms,
        }))
    }

    async fn logout(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        if let Some(jwt) = ctx.jwt() {
            self.tokens.revoke(jwt);
        }
        Ok(json!(true))
    }

    async fn register(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let username = ctx.body_str("username")?.to_lowercase();
        let email = ctx.body_str("email")?.to_string();
        let password = ctx.body_str("password")?.to_string();

        validate_email(&email)?;
        validate_username(&username, self.username_rules.min_length)?;
        validate_password(&password, &self.password_rules)?;

        let user = self
            .users
            .create(NewUser {
                username,
                email,
                password,
                role: "user".to_string(),
            })
            .await?;

        let token = self.tokens.issue(user.id, None)?;

        Ok(json!({
            "id": user.id,
            "jwt": token.jwt,
        }))
    }

    async fn check_token(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        // The gate rejects malformed or expired credentials before this
        // handler runs, so a present token is a valid one.
        let Some(jwt) = ctx.jwt() else {
            return Ok(json!({
                "id": null,
                "ttl": -1,
                "expiresAt": -1,
            }));
        };
        let token = self.tokens.verify(jwt).await?;

        Ok(json!({
            "id": token.user_id,
            "ttl": token.ttl_ms,
            "expiresAt": token.expires_at_ms,
        }))
    }

    async fn get_my_user(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let user_id = ctx.user_id()?;
        let user = self
            .users
            .find_user(user_id)
            .await
            .ok_or(ApiError::UserNotFound)?;

        Ok(json!({
            "id": user.id,
            "username": user.username,
            "email": user.email,
            "role": user.role,
        }))
    }

    async fn update_my_user(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let user_id = ctx.user_id()?;

        let email = ctx.opt_body_str("email").map(str::to_string);
        let username = ctx.opt_body_str("username").map(str::to_lowercase);

        if let Some(email) = &email {
            validate_email(email)?;
        }
        if let Some(username) = &username {
            validate_username(username, self.username_rules.min_length)?;
        }

        let user = self
            .users
            .update(user_id, UserUpdate { username, email, role: None })
            .await?
            .ok_or(ApiError::UserNotFound)?;

        Ok(json!({
            "id": user.id,
            "username": user.username,
            "email": user.email,
        }))
    }

    async fn delete_my_user(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let user_id = ctx.user_id()?;
        Ok(json!(self.users.delete(user_id).await))
    }
}

impl Controller for AuthController {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn routes(&self) -> &'static [ActionRoute] {
        ROUTES
    }

    fn handler(self: Arc<Self>, action: &str) -> Option<ActionHandler> {
        dispatch!(self, action, {
            "login" => login,
            "logout" => logout,
            "register" => register,
            "checkToken" => check_token,
            "getMyUser" => get_my_user,
            "updateMyUser" => update_my_user,
            "deleteMyUser" => delete_my_user,
        })
    }
}
