//! Working time CRUD, in two flavors: `_me` routes scoped to the caller
//! and `:userId` routes for administration.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::api::{ApiError, RequestContext};
use crate::models::WorkingTime;
use crate::services::{
    NewWorkingTime, UserDirectory, WorkingTimeRepository, WorkingTimeUpdate,
};

use super::{ActionHandler, ActionRoute, Controller, dispatch};

const ROUTES: &[ActionRoute] = &[
    ActionRoute { verb: "get", path: "/:userId/_list", action: "listWorkingTimes" },
    ActionRoute { verb: "get", path: "/_me/_list", action: "listMyWorkingTimes" },
    ActionRoute { verb: "get", path: "/:userId/:workId", action: "getWorkingTime" },
    ActionRoute { verb: "get", path: "/_me/:workId", action: "getMyWorkingTime" },
    ActionRoute { verb: "post", path: "/:userId", action: "createWorkingTime" },
    ActionRoute { verb: "post", path: "/_me", action: "createMyWorkingTime" },
    ActionRoute { verb: "put", path: "/:userId/:workId", action: "updateWorkingTime" },
    ActionRoute { verb: "put", path: "/_me/:workId", action: "updateMyWorkingTime" },
    ActionRoute { verb: "delete", path: "/:userId/:workId", action: "deleteWorkingTime" },
    ActionRoute { verb: "delete", path: "/_me/:workId", action: "deleteMyWorkingTime" },
];

pub struct WorkingTimeController {
    users: Arc<dyn UserDirectory>,
    working_times: Arc<dyn WorkingTimeRepository>,
}

impl WorkingTimeController {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        working_times: Arc<dyn WorkingTimeRepository>,
    ) -> Self {
        Self {
            users,
            working_times,
        }
    }

    async fn require_user(&self, user_id: i64) -> Result<(), ApiError> {
        if self.users.find_user(user_id).await.is_none() {
            return Err(ApiError::not_found(format!("user {user_id} not found")));
        }
        Ok(())
    }

    // The owner id stays private; entries are always fetched through it.
    fn entry_json(entry: &WorkingTime) -> Value {
        json!({
            "id": entry.id,
            "start": entry.start,
            "end": entry.end,
            "description": entry.description,
        })
    }

    fn not_found(user_id: i64, work_id: i64) -> ApiError {
        ApiError::not_found(format!("working time {work_id} not found for user {user_id}"))
    }

    async fn list_for(&self, user_id: i64) -> Value {
        let entries = self.working_times.list(user_id).await;
        Value::Array(entries.iter().map(Self::entry_json).collect())
    }

    async fn create_for(&self, user_id: i64, ctx: &RequestContext) -> Result<Value, ApiError> {
        let new = NewWorkingTime {
            start: ctx.body_datetime("start")?,
            end: ctx.body_datetime("end")?,
            description: ctx.opt_body_str("description").unwrap_or_default().to_string(),
        };
        let entry = self.working_times.create(user_id, new).await;
        Ok(Self::entry_json(&entry))
    }

    async fn update_for(
        &self,
        user_id: i64,
        work_id: i64,
        ctx: &RequestContext,
    ) -> Result<Value, ApiError> {
        let update = WorkingTimeUpdate {
            start: ctx.opt_body_datetime("start")?,
            end: ctx.opt_body_datetime("end")?,
            description: ctx.opt_body_str("description").map(str::to_string),
        };
        let entry = self
            .working_times
            .update(user_id, work_id, update)
            .await
            .ok_or_else(|| Self::not_found(user_id, work_id))?;
        Ok(Self::entry_json(&entry))
    }

    async fn list_working_times(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let user_id = ctx.arg_i64("userId")?;
        self.require_user(user_id).await?;
        Ok(self.list_for(user_id).await)
    }

    async fn list_my_working_times(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        Ok(self.list_for(ctx.user_id()?).await)
    }

    async fn get_working_time(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let user_id = ctx.arg_i64("userId")?;
        let work_id = ctx.arg_i64("workId")?;
        self.require_user(user_id).await?;
        let entry = self
            .working_times
            .get(user_id, work_id)
            .await
            .ok_or_else(|| Self::not_found(user_id, work_id))?;
        Ok(Self::entry_json(&entry))
    }

    async fn get_my_working_time(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let user_id = ctx.user_id()?;
        let work_id = ctx.arg_i64("workId")?;
        let entry = self
            .working_times
            .get(user_id, work_id)
            .await
            .ok_or_else(|| Self::not_found(user_id, work_id))?;
        Ok(Self::entry_json(&entry))
    }

    async fn create_working_time(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let user_id = ctx.arg_i64("userId")?;
        self.require_user(user_id).await?;
        self.create_for(user_id, &ctx).await
    }

    async fn create_my_working_time(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let user_id = ctx.user_id()?;
        self.create_for(user_id, &ctx).await
    }

    async fn update_working_time(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let user_id = ctx.arg_i64("userId")?;
        let work_id = ctx.arg_i64("workId")?;
        self.require_user(user_id).await?;
        self.update_for(user_id, work_id, &ctx).await
    }

    async fn update_my_working_time(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let user_id = ctx.user_id()?;
        let work_id = ctx.arg_i64("workId")?;
        self.update_for(user_id, work_id, &ctx).await
    }

    async fn delete_working_time(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let user_id = ctx.arg_i64("userId")?;
        let work_id = ctx.arg_i64("workId")?;
        self.require_user(user_id).await?;
        self.working_times.delete(user_id, work_id).await;
        Ok(json!(true))
    }

    async fn delete_my_working_time(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let user_id = ctx.user_id()?;
        let work_id = ctx.arg_i64("workId")?;
        self.working_times.delete(user_id, work_id).await;
        Ok(json!(true))
    }
}

impl Controller for WorkingTimeController {
    fn name(&self) -> &'static str {
        "workingtime"
    }

    fn routes(&self) -> &'static [ActionRoute] {
        ROUTES
    }

    fn handler(self: Arc<Self>, action: &str) -> Option<ActionHandler> {
        dispatch!(self, action, {
            "listWorkingTimes" => list_working_times,
            "listMyWorkingTimes" => list_my_working_times,
            "getWorkingTime" => get_working_time,
            "getMyWorkingTime" => get_my_working_time,
            "createWorkingTime" => create_working_time,
            "createMyWorkingTime" => create_my_working_time,
            "updateWorkingTime" => update_working_time,
            "updateMyWorkingTime" => update_my_working_time,
            "deleteWorkingTime" => delete_working_time,
            "deleteMyWorkingTime" => delete_my_working_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use crate::api::RequestParts;
    use crate::auth::{Identity, Vault};
    use crate::services::{
        MemoryUserRepository, MemoryWorkingTimeRepository, NewUser, UserRepository,
    };

    use super::*;

    async fn fixture() -> (Arc<WorkingTimeController>, i64) {
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
        let controller = Arc::new(WorkingTimeController::new(
            users,
            Arc::new(MemoryWorkingTimeRepository::new()),
        ));
        (controller, user_id)
    }

    fn request(
        action: &str,
        params: &[(&str, &str)],
        body: Value,
        user_id: Option<i64>,
    ) -> RequestContext {
        let mut ctx = RequestContext::new(
            "workingtime",
            action,
            params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
            RequestParts { body, ..Default::default() },
        );
        if let Some(id) = user_id {
            ctx.set_identity(Identity::User { id, role: "user".into() });
        }
        ctx
    }

    #[tokio::test]
    async fn test_create_list_and_get() {
        let (controller, user_id) = fixture().await;

        let created = controller
            .create_my_working_time(request(
                "createMyWorkingTime",
                &[],
                json!({"start": "2024-05-01T08:00:00Z", "end": "2024-05-01T16:00:00Z", "description": "shift"}),
                Some(user_id),
            ))
            .await
            .unwrap();
        let work_id = created["id"].as_i64().unwrap().to_string();

        let listed = controller
            .list_my_working_times(request("listMyWorkingTimes", &[], Value::Null, Some(user_id)))
            .await
            .unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let fetched = controller
            .get_my_working_time(request(
                "getMyWorkingTime",
                &[("workId", work_id.as_str())],
                Value::Null,
                Some(user_id),
            ))
            .await
            .unwrap();
        assert_eq!(fetched["description"].as_str(), Some("shift"));
        // The owning user id is not echoed back.
        assert!(fetched.get("user_id").is_none());
    }

    #[tokio::test]
    async fn test_create_requires_dates() {
        let (controller, user_id) = fixture().await;
        let err = controller
            .create_my_working_time(request(
                "createMyWorkingTime",
                &[],
                json!({"start": "2024-05-01T08:00:00Z"}),
                Some(user_id),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_update_leaves_missing_fields_alone() {
        let (controller, user_id) = fixture().await;
        let created = controller
            .create_my_working_time(request(
                "createMyWorkingTime",
                &[],
                json!({"start": "2024-05-01T08:00:00Z", "end": "2024-05-01T16:00:00Z"}),
                Some(user_id),
            ))
            .await
            .unwrap();
        let work_id = created["id"].as_i64().unwrap().to_string();

        let updated = controller
            .update_my_working_time(request(
                "updateMyWorkingTime",
                &[("workId", work_id.as_str())],
                json!({"description": "late shift"}),
                Some(user_id),
            ))
            .await
            .unwrap();
        assert_eq!(updated["description"].as_str(), Some("late shift"));
        assert_eq!(updated["start"], created["start"]);
        assert_eq!(updated["end"], created["end"]);
    }

    #[tokio::test]
    async fn test_admin_routes_check_the_user_exists() {
        let (controller, _) = fixture().await;
        let err = controller
            .list_working_times(request(
                "listWorkingTimes",
                &[("userId", "999")],
                Value::Null,
                None,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_entries_are_scoped_per_user() {
        let (controller, user_id) = fixture().await;
        let created = controller
            .create_my_working_time(request(
                "createMyWorkingTime",
                &[],
                json!({"start": "2024-05-01T08:00:00Z", "end": "2024-05-01T16:00:00Z"}),
                Some(user_id),
            ))
            .await
            .unwrap();
        let work_id = created["id"].as_i64().unwrap().to_string();

        // Another identity cannot reach the entry through the _me routes.
        let err = controller
            .get_my_working_time(request(
                "getMyWorkingTime",
                &[("workId", work_id.as_str())],
                Value::Null,
                Some(user_id + 1),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
