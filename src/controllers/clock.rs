//! Clock in / clock out.
//!
//! Each user owns at most one clock. Posting toggles it: the first post
//! starts it, the next one stops it and records the elapsed interval as a
//! working time.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Value, json};

use crate::api::{ApiError, RequestContext};
use crate::models::Clock;
use crate::services::{ClockRepository, NewWorkingTime, UserDirectory, WorkingTimeRepository};

use super::{ActionHandler, ActionRoute, Controller, dispatch};

const ROUTES: &[ActionRoute] = &[
    ActionRoute { verb: "get", path: "/_me", action: "getMyClock" },
    ActionRoute { verb: "get", path: "/:userId", action: "getClock" },
    ActionRoute { verb: "post", path: "/_me", action: "createOrUpdateMyClock" },
    ActionRoute { verb: "post", path: "/:userId", action: "createOrUpdate" },
    ActionRoute { verb: "delete", path: "/_me", action: "deleteMyClock" },
    ActionRoute { verb: "delete", path: "/:userId", action: "delete" },
];

pub struct ClockController {
    users: Arc<dyn UserDirectory>,
    clocks: Arc<dyn ClockRepository>,
    working_times: Arc<dyn WorkingTimeRepository>,
}

impl ClockController {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        clocks: Arc<dyn ClockRepository>,
        working_times: Arc<dyn WorkingTimeRepository>,
    ) -> Self {
        Self {
            users,
            clocks,
            working_times,
        }
    }

    async fn require_user(&self, user_id: i64) -> Result<(), ApiError> {
        if self.users.find_user(user_id).await.is_none() {
            return Err(ApiError::not_found(format!("user {user_id} not found")));
        }
        Ok(())
    }

    /// Start or stop a user's clock. Stopping records a working time
    /// covering the elapsed period; starting again resets the start date.
    async fn toggle(&self, user_id: i64) -> Result<Clock, ApiError> {
        let clock = match self.clocks.get(user_id).await {
            None => self.clocks.create(user_id).await,
            Some(clock) => {
                let (start, status) = if clock.status {
                    self.working_times
                        .create(
                            user_id,
                            NewWorkingTime {
                                start: clock.start,
                                end: Utc::now(),
                                description: String::new(),
                            },
                        )
                        .await;
                    (clock.start, false)
                } else {
                    (Utc::now(), true)
                };
                self.clocks
                    .update(user_id, start, status)
                    .await
                    .ok_or_else(|| ApiError::Internal("clock update failed".into()))?
            }
        };
        Ok(clock)
    }

    fn clock_json(clock: &Clock) -> Value {
        json!({
            "status": clock.status,
            "start": clock.start,
        })
    }

    async fn get_my_clock(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let user_id = ctx.user_id()?;
        let clock = self
            .clocks
            .get(user_id)
            .await
            .ok_or_else(|| ApiError::not_found(format!("no clock for user {user_id}")))?;
        Ok(Self::clock_json(&clock))
    }

    async fn get_clock(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let user_id = ctx.arg_i64("userId")?;
        self.require_user(user_id).await?;
        let clock = self
            .clocks
            .get(user_id)
            .await
            .ok_or_else(|| ApiError::not_found(format!("no clock for user {user_id}")))?;
        Ok(Self::clock_json(&clock))
    }

    async fn create_or_update_my_clock(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let clock = self.toggle(ctx.user_id()?).await?;
        Ok(Self::clock_json(&clock))
    }

    async fn create_or_update(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let user_id = ctx.arg_i64("userId")?;
        self.require_user(user_id).await?;
        let clock = self.toggle(user_id).await?;
        Ok(Self::clock_json(&clock))
    }

    async fn delete_my_clock(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        self.clocks.delete(ctx.user_id()?).await;
        Ok(json!(true))
    }

    async fn delete(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let user_id = ctx.arg_i64("userId")?;
        self.require_user(user_id).await?;
        self.clocks.delete(user_id).await;
        Ok(json!(true))
    }
}

impl Controller for ClockController {
    fn name(&self) -> &'static str {
        "clock"
    }

    fn routes(&self) -> &'static [ActionRoute] {
        ROUTES
    }

    fn handler(self: Arc<Self>, action: &str) -> Option<ActionHandler> {
        dispatch!(self, action, {
            "getMyClock" => get_my_clock,
            "getClock" => get_clock,
            "createOrUpdateMyClock" => create_or_update_my_clock,
            "createOrUpdate" => create_or_update,
            "deleteMyClock" => delete_my_clock,
            "delete" => delete,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::api::RequestParts;
    use crate::auth::{Identity, Vault};
    use crate::services::{
        MemoryClockRepository, MemoryUserRepository, MemoryWorkingTimeRepository, NewUser,
        UserRepository,
    };

    use super::*;

    struct Fixture {
        controller: Arc<ClockController>,
        working_times: Arc<MemoryWorkingTimeRepository>,
        user_id: i64,
    }

    async fn fixture() -> Fixture {
        let users = Arc::new(MemoryUserRepository::new(Vault::new("", 10)));
        let user_id = users
            .create(NewUser {
                username: "alice".into(),
                email: "alice@example.com".into(),
                password: "Sup3rSecret".into(),
                role: "user".into(),
            })
            .await
            .unwrap()
            .id;

        let working_times = Arc::new(MemoryWorkingTimeRepository::new());
        let controller = Arc::new(ClockController::new(
            users,
            Arc::new(MemoryClockRepository::new()),
            Arc::clone(&working_times) as Arc<dyn WorkingTimeRepository>,
        ));
        Fixture {
            controller,
            working_times,
            user_id,
        }
    }

    fn my_request(action: &str, user_id: i64) -> RequestContext {
        let mut ctx = RequestContext::new(
            "clock",
            action,
            HashMap::new(),
            RequestParts::default(),
        );
        ctx.set_identity(Identity::User { id: user_id, role: "user".into() });
        ctx
    }

    #[tokio::test]
    async fn test_first_post_starts_the_clock() {
        let fx = fixture().await;
        let out = fx
            .controller
            .create_or_update_my_clock(my_request("createOrUpdateMyClock", fx.user_id))
            .await
            .unwrap();
        assert_eq!(out["status"].as_bool(), Some(true));
        assert!(out["start"].is_string());
    }

    #[tokio::test]
    async fn test_stopping_records_a_working_time() {
        let fx = fixture().await;
        fx.controller
            .create_or_update_my_clock(my_request("createOrUpdateMyClock", fx.user_id))
            .await
            .unwrap();

        let out = fx
            .controller
            .create_or_update_my_clock(my_request("createOrUpdateMyClock", fx.user_id))
            .await
            .unwrap();
        assert_eq!(out["status"].as_bool(), Some(false));

        let recorded = fx.working_times.list(fx.user_id).await;
        assert_eq!(recorded.len(), 1);
        assert!(recorded[0].end >= recorded[0].start);
    }

    #[tokio::test]
    async fn test_restarting_resets_the_start_date() {
        let fx = fixture().await;
        for _ in 0..2 {
            fx.controller
                .create_or_update_my_clock(my_request("createOrUpdateMyClock", fx.user_id))
                .await
                .unwrap();
        }

        let out = fx
            .controller
            .create_or_update_my_clock(my_request("createOrUpdateMyClock", fx.user_id))
            .await
            .unwrap();
        assert_eq!(out["status"].as_bool(), Some(true));
        // No new working time until the clock stops again.
        assert_eq!(fx.working_times.list(fx.user_id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_get_clock_for_unknown_user() {
        let fx = fixture().await;
        let ctx = RequestContext::new(
            "clock",
            "getClock",
            [("userId".to_string(), "999".to_string())].into(),
            RequestParts::default(),
        );
        let err = fx.controller.get_clock(ctx).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_get_my_clock_before_any_post() {
        let fx = fixture().await;
        let err = fx
            .controller
            .get_my_clock(my_request("getMyClock", fx.user_id))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
