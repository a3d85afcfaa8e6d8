//! The request funnel.
//!
//! Every API call passes through here in a fixed order: shutdown check,
//! route resolution, rate limiting, identity resolution, permission check,
//! handler invocation. Controllers behind the funnel can assume the caller
//! was allowed to reach them.

use std::sync::Arc;

use serde_json::Value;

use crate::auth::{AuthError, Identity, TokenVerifier};
use crate::authz::{AuthzError, PermissionTable};
use crate::controllers::{ActionHandler, Controller};
use crate::routing::{Router, RoutingError};
use crate::services::UserDirectory;
use crate::state::StateHandle;

use super::{ApiError, RateLimiter, RequestContext, RequestParts};

pub struct Funnel {
    router: Router<ActionHandler>,
    permissions: PermissionTable,
    tokens: Arc<dyn TokenVerifier>,
    users: Arc<dyn UserDirectory>,
    state: StateHandle,
    rate_limiter: Arc<RateLimiter>,
}

impl std::fmt::Debug for Funnel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Funnel").finish_non_exhaustive()
    }
}

impl Funnel {
    /// Build the routing table from the controllers' declarations.
    ///
    /// Fails with `InvalidHandler` when a declared action has no handler
    /// and with `DuplicateRoute` on colliding templates; both abort
    /// startup.
    pub fn new(
        controllers: &[Arc<dyn Controller>],
        permissions: PermissionTable,
        tokens: Arc<dyn TokenVerifier>,
        users: Arc<dyn UserDirectory>,
        state: StateHandle,
        rate_limiter: Arc<RateLimiter>,
    ) -> Result<Self, RoutingError> {
        let mut router = Router::new();

        for controller in controllers {
            let name = controller.name();
            for route in controller.routes() {
                let path = if route.path.starts_with('/') {
                    format!("/api/{}{}", name, route.path)
                } else {
                    format!("/api/{}/{}", name, route.path)
                };

                let handler = Arc::clone(controller).handler(route.action).ok_or_else(|| {
                    RoutingError::InvalidHandler {
                        controller: name.to_string(),
                        action: route.action.to_string(),
                    }
                })?;

                router.attach(route.verb, &path, handler, name, route.action)?;
            }
        }

        tracing::info!(routes = router.len(), "routing table built");

        Ok(Self {
            router,
            permissions,
            tokens,
            users,
            state,
            rate_limiter,
        })
    }

    pub async fn execute(
        &self,
        verb: &str,
        path: &str,
        parts: RequestParts,
    ) -> Result<Value, ApiError> {
        if self.state.is_shutting_down() {
            return Err(ApiError::ShuttingDown);
        }

        let resolved = self.router.resolve(verb, path)?;

        if !self
            .rate_limiter
            .check(parts.client_ip, &resolved.controller, &resolved.action)
        {
            return Err(ApiError::RateLimited {
                controller: resolved.controller,
                action: resolved.action,
            });
        }

        let mut ctx =
            RequestContext::new(resolved.controller, resolved.action, resolved.params, parts);
        self.check_rights(&mut ctx).await?;

        (resolved.handler)(ctx).await
    }

    /// Resolve the caller's identity and check it against the permission
    /// table. A missing credential is a legitimate anonymous request; a
    /// bad one is an error in its own right.
    async fn check_rights(&self, ctx: &mut RequestContext) -> Result<(), ApiError> {
        let identity = self.resolve_identity(ctx.jwt()).await?;

        match &identity {
            Identity::Anonymous => {
                tracing::debug!("request made as anonymous");
            }
            Identity::User { id, role } => {
                tracing::debug!(user_id = id, role, "request made as user");
            }
        }

        if !self
            .permissions
            .is_allowed(identity.role(), ctx.controller(), ctx.action())
        {
            tracing::debug!(
                controller = ctx.controller(),
                action = ctx.action(),
                role = identity.role(),
                "insufficient permissions"
            );
            return Err(AuthzError::denied(ctx.controller(), ctx.action()).into());
        }

        ctx.set_identity(identity);
        Ok(())
    }

    async fn resolve_identity(&self, jwt: Option<&str>) -> Result<Identity, ApiError> {
        let Some(jwt) = jwt else {
            return Ok(Identity::Anonymous);
        };

        let token = self.tokens.verify(jwt).await?;
        let user = self
            .users
            .find_user(token.user_id)
            .await
            .ok_or(AuthError::UserNotFound(token.user_id))?;

        Ok(Identity::User {
            id: user.id,
            role: user.role,
        })
    }
}
