//! User administration: CRUD on arbitrary accounts and role assignment.
//!
//! Everything here operates on other users; who may call it is decided by
//! the permission table, not by this controller.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::api::{ApiError, RequestContext};
use crate::authz::{ANONYMOUS_ROLE, PermissionTable};
use crate::config::{PasswordRules, UsernameRules};
use crate::services::{NewUser, UserRepository, UserUpdate};

use super::{
    ActionHandler, ActionRoute, Controller, dispatch, validate_email, validate_password,
    validate_username,
};

const ROUTES: &[ActionRoute] = &[
    ActionRoute { verb: "get", path: "/_list", action: "listUsers" },
    ActionRoute { verb: "get", path: "/:userId", action: "getUser" },
    ActionRoute { verb: "post", path: "/", action: "createUser" },
    ActionRoute { verb: "put", path: "/:userId", action: "updateUser" },
    ActionRoute { verb: "delete", path: "/:userId", action: "deleteUser" },
    ActionRoute { verb: "put", path: "/:userId/_role", action: "updateUserRole" },
];

pub struct SecurityController {
    users: Arc<dyn UserRepository>,
    permissions: PermissionTable,
    username_rules: UsernameRules,
    password_rules: PasswordRules,
}

impl SecurityController {
    pub fn new(
        users: Arc<dyn UserRepository>,
        permissions: PermissionTable,
        username_rules: UsernameRules,
        password_rules: PasswordRules,
    ) -> Self {
        Self {
            users,
            permissions,
            username_rules,
            password_rules,
        }
    }

    async fn list_users(&self, _ctx: RequestContext) -> Result<Value, ApiError> {
        Ok(json!(self.users.list().await))
    }

    async fn get_user(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let user_id = ctx.arg_i64("userId")?;
        let user = self
            .users
            .find_user(user_id)
            .await
            .ok_or_else(|| ApiError::not_found(format!("user {user_id} not found")))?;

        Ok(json!({
            "id": user.id,
            "username": user.username,
            "email": user.email,
            "role": user.role,
        }))
    }

    async fn create_user(&self, ctx: RequestContext) -> Result<Value, ApiError> {
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

        Ok(json!({
            "id": user.id,
            "username": user.username,
            "email": user.email,
        }))
    }

    async fn update_user(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let user_id = ctx.arg_i64("userId")?;

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
            .ok_or_else(|| ApiError::not_found(format!("user {user_id} not found")))?;

        Ok(json!({
            "id": user.id,
            "username": user.username,
            "email": user.email,
        }))
    }

    async fn update_user_role(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let user_id = ctx.arg_i64("userId")?;
        let role = ctx.body_str("role")?.to_lowercase();

        // Roles come from the permission table; anonymous is never
        // assignable to an account.
        if role == ANONYMOUS_ROLE || !self.permissions.has_role(&role) {
            return Err(ApiError::bad_request(format!(
                "invalid role {role}, expected one of [{}]",
                self.permissions.assignable_roles().join(", ")
            )));
        }

        let user = self
            .users
            .update(
                user_id,
                UserUpdate { role: Some(role), ..Default::default() },
            )
            .await?
            .ok_or_else(|| ApiError::not_found(format!("user {user_id} not found")))?;

        Ok(json!({
            "id": user.id,
            "username": user.username,
            "email": user.email,
            "role": user.role,
        }))
    }

    async fn delete_user(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let user_id = ctx.arg_i64("userId")?;
        self.users.delete(user_id).await;
        Ok(json!(true))
    }
}

impl Controller for SecurityController {
    fn name(&self) -> &'static str {
        "security"
    }

    fn routes(&self) -> &'static [ActionRoute] {
        ROUTES
    }

    fn handler(self: Arc<Self>, action: &str) -> Option<ActionHandler> {
        dispatch!(self, action, {
            "listUsers" => list_users,
            "getUser" => get_user,
            "createUser" => create_user,
            "updateUser" => update_user,
            "deleteUser" => delete_user,
            "updateUserRole" => update_user_role,
        })
    }
}
