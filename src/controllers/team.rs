//! Team management.
//!
//! Admin routes act on any team; `_me` routes are restricted to teams the
//! caller owns (plus read access for plain members).

use std::sync::Arc;

use serde_json::{Value, json};

use crate::api::{ApiError, RequestContext};
use crate::models::Team;
use crate::services::{TeamRepository, UserDirectory};

use super::{ActionHandler, ActionRoute, Controller, dispatch};

const MIN_TEAM_NAME_LENGTH: usize = 3;

const ROUTES: &[ActionRoute] = &[
    ActionRoute { verb: "post", path: "/", action: "createTeam" },
    ActionRoute { verb: "get", path: "/_list", action: "listTeams" },
    ActionRoute { verb: "get", path: "/:userId/_list", action: "listUserTeams" },
    ActionRoute { verb: "get", path: "/:teamName", action: "getTeamByName" },
    ActionRoute { verb: "delete", path: "/:teamName", action: "deleteTeam" },
    ActionRoute { verb: "put", path: "/:teamName/:userId", action: "addTeamUser" },
    ActionRoute { verb: "delete", path: "/:teamName/:userId", action: "removeTeamUser" },
    ActionRoute { verb: "post", path: "/_me", action: "createOwnedTeam" },
    ActionRoute { verb: "delete", path: "/_me/:teamName", action: "deleteOwnedTeam" },
    ActionRoute { verb: "get", path: "/_me/_list", action: "listOwnedTeams" },
    ActionRoute { verb: "get", path: "/_me/:teamName", action: "getOwnedTeamByName" },
    ActionRoute { verb: "put", path: "/_me/:teamName/:userId", action: "addOwnedTeamUser" },
    ActionRoute { verb: "delete", path: "/_me/:teamName/:userId", action: "removeOwnedTeamUser" },
];

pub struct TeamController {
    teams: Arc<dyn TeamRepository>,
    users: Arc<dyn UserDirectory>,
}

impl TeamController {
    pub fn new(teams: Arc<dyn TeamRepository>, users: Arc<dyn UserDirectory>) -> Self {
        Self { teams, users }
    }

    async fn require_user(&self, user_id: i64) -> Result<(), ApiError> {
        if self.users.find_user(user_id).await.is_none() {
            return Err(ApiError::not_found(format!("user {user_id} not found")));
        }
        Ok(())
    }

    async fn require_owned(&self, name: &str, user_id: i64) -> Result<(), ApiError> {
        if !self.teams.is_owner(name, user_id).await {
            return Err(ApiError::Forbidden(format!(
                "team {name} is not owned by the current user"
            )));
        }
        Ok(())
    }

    fn validate_name(name: &str) -> Result<(), ApiError> {
        if name.len() < MIN_TEAM_NAME_LENGTH {
            return Err(ApiError::bad_request(format!(
                "team name must be at least {MIN_TEAM_NAME_LENGTH} characters"
            )));
        }
        Ok(())
    }

    fn team_json(team: &Team) -> Value {
        json!({
            "name": team.name,
            "owner_id": team.owner_id,
            "members_id": team.members_id,
        })
    }

    async fn create(&self, name: &str, owner_id: Option<i64>) -> Result<Value, ApiError> {
        Self::validate_name(name)?;
        if let Some(owner_id) = owner_id {
            self.require_user(owner_id).await?;
        }
        let team = self.teams.create(name, owner_id).await?;
        Ok(json!({
            "name": team.name,
            "owner_id": team.owner_id,
        }))
    }

    async fn create_team(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        ctx.user_id()?;
        let name = ctx.body_str("name")?;
        // An explicit owner_id of 0 means no owner.
        let owner_id = ctx.opt_body_i64("owner_id").filter(|id| *id != 0);
        self.create(name, owner_id).await
    }

    async fn create_owned_team(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let owner_id = ctx.user_id()?;
        let name = ctx.body_str("name")?;
        self.create(name, Some(owner_id)).await
    }

    async fn list_teams(&self, _ctx: RequestContext) -> Result<Value, ApiError> {
        Ok(json!(self.teams.list().await))
    }

    async fn list_user_teams(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let user_id = ctx.arg_i64("userId")?;
        Ok(json!(self.teams.list_for_user(user_id).await))
    }

    async fn list_owned_teams(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let user_id = ctx.user_id()?;
        Ok(json!(self.teams.list_for_user(user_id).await))
    }

    async fn get_team_by_name(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let name = ctx.arg_str("teamName")?;
        let team = self
            .teams
            .get(name)
            .await
            .ok_or_else(|| ApiError::not_found(format!("team {name} not found")))?;
        Ok(Self::team_json(&team))
    }

    async fn get_owned_team_by_name(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let user_id = ctx.user_id()?;
        let name = ctx.arg_str("teamName")?;

        // Owners and members may read the team through this route.
        let owned = self.teams.is_owner(name, user_id).await;
        let member = match self.teams.get(name).await {
            Some(team) => team.members_id.contains(&user_id),
            None => false,
        };
        if !owned && !member {
            return Err(ApiError::Forbidden(format!(
                "team {name} is not owned by the current user"
            )));
        }

        let team = self
            .teams
            .get(name)
            .await
            .ok_or_else(|| ApiError::not_found(format!("team {name} not found")))?;
        Ok(Self::team_json(&team))
    }

    async fn delete_team(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let name = ctx.arg_str("teamName")?;
        Ok(json!(self.teams.delete(name).await))
    }

    async fn delete_owned_team(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let user_id = ctx.user_id()?;
        let name = ctx.arg_str("teamName")?;
        self.require_owned(name, user_id).await?;
        Ok(json!(self.teams.delete(name).await))
    }

    async fn add_member(&self, name: &str, user_id: i64) -> Result<Value, ApiError> {
        self.require_user(user_id).await?;
        let team = self
            .teams
            .add_user(name, user_id)
            .await
            .ok_or_else(|| ApiError::not_found(format!("team {name} not found")))?;
        Ok(Self::team_json(&team))
    }

    async fn remove_member(&self, name: &str, user_id: i64) -> Result<Value, ApiError> {
        let team = self
            .teams
            .remove_user(name, user_id)
            .await
            .ok_or_else(|| ApiError::not_found(format!("team {name} not found")))?;
        Ok(Self::team_json(&team))
    }

    async fn add_team_user(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let name = ctx.arg_str("teamName")?;
        let user_id = ctx.arg_i64("userId")?;
        self.add_member(name, user_id).await
    }

    async fn remove_team_user(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let name = ctx.arg_str("teamName")?;
        let user_id = ctx.arg_i64("userId")?;
        self.remove_member(name, user_id).await
    }

    async fn add_owned_team_user(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let caller = ctx.user_id()?;
        let name = ctx.arg_str("teamName")?;
        let user_id = ctx.arg_i64("userId")?;
        self.require_owned(name, caller).await?;
        self.add_member(name, user_id).await
    }

    async fn remove_owned_team_user(&self, ctx: RequestContext) -> Result<Value, ApiError> {
        let caller = ctx.user_id()?;
        let name = ctx.arg_str("teamName")?;
        let user_id = ctx.arg_i64("userId")?;
        self.require_owned(name, caller).await?;
        self.remove_member(name, user_id).await
    }
}

impl Controller for TeamController {
    fn name(&self) -> &'static str {
        "team"
    }

    fn routes(&self) -> &'static [ActionRoute] {
        ROUTES
    }

    fn handler(self: Arc<Self>, action: &str) -> Option<ActionHandler> {
        dispatch!(self, action, {
            "createTeam" => create_team,
            "listTeams" => list_teams,
            "listUserTeams" => list_user_teams,
            "getTeamByName" => get_team_by_name,
            "deleteTeam" => delete_team,
            "addTeamUser" => add_team_user,
            "removeTeamUser" => remove_team_user,
            "createOwnedTeam" => create_owned_team,
            "deleteOwnedTeam" => delete_owned_team,
            "listOwnedTeams" => list_owned_teams,
            "getOwnedTeamByName" => get_owned_team_by_name,
            "addOwnedTeamUser" => add_owned_team_user,
            "removeOwnedTeamUser" => remove_owned_team_user,
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
        MemoryTeamRepository, MemoryUserRepository, NewUser, UserRepository,
    };

    use super::*;

    struct Fixture {
        controller: Arc<TeamController>,
        owner_id: i64,
        other_id: i64,
    }

    async fn fixture() -> Fixture {
        let users = Arc::new(MemoryUserRepository::new(Vault::new("", 10)));
        let mut ids = Vec::new();
        for (name, email) in [("alice", "alice@example.com"), ("bobby", "bob@example.com")] {
            ids.push(
                users
                    .create(NewUser {
                        username: name.into(),
                        email: email.into(),
                        password: "Sup3rSecret".into(),
                        role: "user".into(),
                    })
                    .await
                    .unwrap()
                    .id,
            );
        }
        let controller = Arc::new(TeamController::new(
            Arc::new(MemoryTeamRepository::new()),
            users,
        ));
        Fixture {
            controller,
            owner_id: ids[0],
            other_id: ids[1],
        }
    }

    fn request(
        action: &str,
        params: &[(&str, &str)],
        body: Value,
        user_id: Option<i64>,
    ) -> RequestContext {
        let mut ctx = RequestContext::new(
            "team",
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
    async fn test_create_owned_team_sets_owner() {
        let fx = fixture().await;
        let out = fx
            .controller
            .create_owned_team(request(
                "createOwnedTeam",
                &[],
                json!({"name": "backend"}),
                Some(fx.owner_id),
            ))
            .await
            .unwrap();
        assert_eq!(out["owner_id"].as_i64(), Some(fx.owner_id));
    }

    #[tokio::test]
    async fn test_team_name_too_short() {
        let fx = fixture().await;
        let err = fx
            .controller
            .create_owned_team(request(
                "createOwnedTeam",
                &[],
                json!({"name": "ab"}),
                Some(fx.owner_id),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_create_team_rejects_unknown_owner() {
        let fx = fixture().await;
        let err = fx
            .controller
            .create_team(request(
                "createTeam",
                &[],
                json!({"name": "backend", "owner_id": 999}),
                Some(fx.owner_id),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_duplicate_team_is_a_conflict() {
        let fx = fixture().await;
        let body = json!({"name": "backend"});
        fx.controller
            .create_owned_team(request("createOwnedTeam", &[], body.clone(), Some(fx.owner_id)))
            .await
            .unwrap();
        let err = fx
            .controller
            .create_owned_team(request("createOwnedTeam", &[], body, Some(fx.owner_id)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_owned_routes_reject_non_owner() {
        let fx = fixture().await;
        fx.controller
            .create_owned_team(request(
                "createOwnedTeam",
                &[],
                json!({"name": "backend"}),
                Some(fx.owner_id),
            ))
            .await
            .unwrap();

        let err = fx
            .controller
            .delete_owned_team(request(
                "deleteOwnedTeam",
                &[("teamName", "backend")],
                Value::Null,
                Some(fx.other_id),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_members_can_read_owned_team() {
        let fx = fixture().await;
        fx.controller
            .create_owned_team(request(
                "createOwnedTeam",
                &[],
                json!({"name": "backend"}),
                Some(fx.owner_id),
            ))
            .await
            .unwrap();
        let other = fx.other_id.to_string();
        fx.controller
            .add_owned_team_user(request(
                "addOwnedTeamUser",
                &[("teamName", "backend"), ("userId", other.as_str())],
                Value::Null,
                Some(fx.owner_id),
            ))
            .await
            .unwrap();

        // A plain member may read, but not delete.
        let out = fx
            .controller
            .get_owned_team_by_name(request(
                "getOwnedTeamByName",
                &[("teamName", "backend")],
                Value::Null,
                Some(fx.other_id),
            ))
            .await
            .unwrap();
        assert_eq!(out["name"].as_str(), Some("backend"));

        let err = fx
            .controller
            .delete_owned_team(request(
                "deleteOwnedTeam",
                &[("teamName", "backend")],
                Value::Null,
                Some(fx.other_id),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_add_and_remove_member() {
        let fx = fixture().await;
        fx.controller
            .create_owned_team(request(
                "createOwnedTeam",
                &[],
                json!({"name": "backend"}),
                Some(fx.owner_id),
            ))
            .await
            .unwrap();
        let other = fx.other_id.to_string();
        let params = [("teamName", "backend"), ("userId", other.as_str())];

        let out = fx
            .controller
            .add_team_user(request("addTeamUser", &params, Value::Null, None))
            .await
            .unwrap();
        assert_eq!(out["members_id"], json!([fx.other_id]));

        let out = fx
            .controller
            .remove_team_user(request("removeTeamUser", &params, Value::Null, None))
            .await
            .unwrap();
        assert_eq!(out["members_id"], json!([]));
    }

    #[tokio::test]
    async fn test_unknown_team_is_not_found() {
        let fx = fixture().await;
        let err = fx
            .controller
            .get_team_by_name(request(
                "getTeamByName",
                &[("teamName", "ghosts")],
                Value::Null,
                None,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
