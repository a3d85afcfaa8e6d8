//! In-memory repository implementations.
//!
//! Single-node stores guarded by `parking_lot` locks. Id sequences are
//! plain atomics; nothing here survives a restart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::auth::Vault;
use crate::models::{Clock, Team, User, WorkingTime};

use super::{
    ClockRepository, NewUser, NewWorkingTime, RepositoryError, TeamRepository, UserDirectory,
    UserRepository, UserUpdate, WorkingTimeRepository, WorkingTimeUpdate,
};

struct StoredUser {
    user: User,
    password_hash: String,
}

pub struct MemoryUserRepository {
    vault: Vault,
    users: RwLock<HashMap<i64, StoredUser>>,
    next_id: AtomicI64,
}

impl MemoryUserRepository {
    pub fn new(vault: Vault) -> Self {
        Self {
            vault,
            users: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl UserDirectory for MemoryUserRepository {
    async fn find_user(&self, id: i64) -> Option<User> {
        self.users.read().get(&id).map(|stored| stored.user.clone())
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, new: NewUser) -> Result<User, RepositoryError> {
        let mut users = self.users.write();

        if users.values().any(|s| s.user.username == new.username) {
            return Err(RepositoryError::UsernameTaken);
        }
        if users.values().any(|s| s.user.email == new.email) {
            return Err(RepositoryError::EmailTaken);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let user = User {
            id,
            username: new.username,
            email: new.email,
            role: new.role,
        };
        users.insert(
            id,
            StoredUser {
                user: user.clone(),
                password_hash: self.vault.hash(&new.password),
            },
        );
        Ok(user)
    }

    async fn verify(&self, username: &str, password: &str) -> Option<User> {
        let users = self.users.read();
        let stored = users.values().find(|s| s.user.username == username)?;
        self.vault
            .verify(password, &stored.password_hash)
            .then(|| stored.user.clone())
    }

    async fn list(&self) -> Vec<User> {
        let mut all: Vec<User> = self
            .users
            .read()
            .values()
            .map(|stored| stored.user.clone())
            .collect();
        all.sort_by_key(|user| user.id);
        all
    }

    async fn update(&self, id: i64, update: UserUpdate) -> Result<Option<User>, RepositoryError> {
        let mut users = self.users.write();

        if let Some(username) = &update.username {
            if users
                .values()
                .any(|s| s.user.id != id && &s.user.username == username)
            {
                return Err(RepositoryError::UsernameTaken);
            }
        }
        if let Some(email) = &update.email {
            if users
                .values()
                .any(|s| s.user.id != id && &s.user.email == email)
            {
                return Err(RepositoryError::EmailTaken);
            }
        }

        let Some(stored) = users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = update.username {
            stored.user.username = username;
        }
        if let Some(email) = update.email {
            stored.user.email = email;
        }
        if let Some(role) = update.role {
            stored.user.role = role;
        }
        Ok(Some(stored.user.clone()))
    }

    async fn delete(&self, id: i64) -> bool {
        self.users.write().remove(&id).is_some()
    }
}

#[derive(Default)]
pub struct MemoryClockRepository {
    clocks: RwLock<HashMap<i64, Clock>>,
}

impl MemoryClockRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClockRepository for MemoryClockRepository {
    async fn get(&self, user_id: i64) -> Option<Clock> {
        self.clocks.read().get(&user_id).cloned()
    }

    async fn create(&self, user_id: i64) -> Clock {
        let clock = Clock {
            user_id,
            start: Utc::now(),
            status: true,
        };
        self.clocks.write().insert(user_id, clock.clone());
        clock
    }

    async fn update(&self, user_id: i64, start: DateTime<Utc>, status: bool) -> Option<Clock> {
        let mut clocks = self.clocks.write();
        let clock = clocks.get_mut(&user_id)?;
        clock.start = start;
        clock.status = status;
        Some(clock.clone())
    }

    async fn delete(&self, user_id: i64) -> bool {
        self.clocks.write().remove(&user_id).is_some()
    }
}

#[derive(Default)]
pub struct MemoryWorkingTimeRepository {
    entries: RwLock<Vec<WorkingTime>>,
    next_id: AtomicI64,
}

impl MemoryWorkingTimeRepository {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl WorkingTimeRepository for MemoryWorkingTimeRepository {
    async fn list(&self, user_id: i64) -> Vec<WorkingTime> {
        self.entries
            .read()
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .cloned()
            .collect()
    }

    async fn get(&self, user_id: i64, work_id: i64) -> Option<WorkingTime> {
        self.entries
            .read()
            .iter()
            .find(|entry| entry.user_id == user_id && entry.id == work_id)
            .cloned()
    }

    async fn create(&self, user_id: i64, new: NewWorkingTime) -> WorkingTime {
        let entry = WorkingTime {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            user_id,
            start: new.start,
            end: new.end,
            description: new.description,
        };
        self.entries.write().push(entry.clone());
        entry
    }

    async fn update(
        &self,
        user_id: i64,
        work_id: i64,
        update: WorkingTimeUpdate,
    ) -> Option<WorkingTime> {
        let mut entries = self.entries.write();
        let entry = entries
            .iter_mut()
            .find(|entry| entry.user_id == user_id && entry.id == work_id)?;
        if let Some(start) = update.start {
            entry.start = start;
        }
        if let Some(end) = update.end {
            entry.end = end;
        }
        if let Some(description) = update.description {
            entry.description = description;
        }
        Some(entry.clone())
    }

    async fn delete(&self, user_id: i64, work_id: i64) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|entry| !(entry.user_id == user_id && entry.id == work_id));
        entries.len() != before
    }
}

#[derive(Default)]
pub struct MemoryTeamRepository {
    teams: RwLock<HashMap<String, Team>>,
}

impl MemoryTeamRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TeamRepository for MemoryTeamRepository {
    async fn create(&self, name: &str, owner_id: Option<i64>) -> Result<Team, RepositoryError> {
        let mut teams = self.teams.write();
        if teams.contains_key(name) {
            return Err(RepositoryError::TeamExists(name.to_string()));
        }
        let team = Team {
            name: name.to_string(),
            owner_id,
            members_id: Vec::new(),
        };
        teams.insert(name.to_string(), team.clone());
        Ok(team)
    }

    async fn list(&self) -> Vec<Team> {
        let mut all: Vec<Team> = self.teams.read().values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    async fn get(&self, name: &str) -> Option<Team> {
        self.teams.read().get(name).cloned()
    }

    async fn delete(&self, name: &str) -> bool {
        self.teams.write().remove(name).is_some()
    }

    async fn add_user(&self, name: &str, user_id: i64) -> Option<Team> {
        let mut teams = self.teams.write();
        let team = teams.get_mut(name)?;
        if !team.members_id.contains(&user_id) {
            team.members_id.push(user_id);
        }
        Some(team.clone())
    }

    async fn remove_user(&self, name: &str, user_id: i64) -> Option<Team> {
        let mut teams = self.teams.write();
        let team = teams.get_mut(name)?;
        team.members_id.retain(|id| *id != user_id);
        Some(team.clone())
    }

    async fn list_for_user(&self, user_id: i64) -> Vec<Team> {
        let mut teams: Vec<Team> = self
            .teams
            .read()
            .values()
            .filter(|team| team.members_id.contains(&user_id) || team.owner_id == Some(user_id))
            .cloned()
            .collect();
        teams.sort_by(|a, b| a.name.cmp(&b.name));
        teams
    }

    async fn is_owner(&self, name: &str, user_id: i64) -> bool {
        self.teams
            .read()
            .get(name)
            .is_some_and(|team| team.owner_id == Some(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_repo() -> MemoryUserRepository {
        MemoryUserRepository::new(Vault::new("test", 10))
    }

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password: "Password1".to_string(),
            role: "user".to_string(),
        }
    }

    #[tokio::test]
    async fn test_user_create_and_verify() {
        let repo = user_repo();
        let created = repo.create(new_user("alice", "alice@example.com")).await.unwrap();
        assert_eq!(created.id, 1);

        let verified = repo.verify("alice", "Password1").await.unwrap();
        assert_eq!(verified.id, created.id);
        assert!(repo.verify("alice", "wrong").await.is_none());
        assert!(repo.verify("bob", "Password1").await.is_none());
    }

    #[tokio::test]
    async fn test_user_uniqueness() {
        let repo = user_repo();
        repo.create(new_user("alice", "alice@example.com")).await.unwrap();

        let err = repo
            .create(new_user("alice", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::UsernameTaken));

        let err = repo
            .create(new_user("bob", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::EmailTaken));
    }

    #[tokio::test]
    async fn test_user_update_role() {
        let repo = user_repo();
        let user = repo.create(new_user("alice", "alice@example.com")).await.unwrap();

        let updated = repo
            .update(
                user.id,
                UserUpdate {
                    role: Some("manager".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.role, "manager");
        assert_eq!(repo.find_user(user.id).await.unwrap().role, "manager");
    }

    #[tokio::test]
    async fn test_deleted_user_gone_from_directory() {
        let repo = user_repo();
        let user = repo.create(new_user("alice", "alice@example.com")).await.unwrap();
        assert!(repo.delete(user.id).await);
        assert!(repo.find_user(user.id).await.is_none());
        assert!(!repo.delete(user.id).await);
    }

    #[tokio::test]
    async fn test_clock_lifecycle() {
        let repo = MemoryClockRepository::new();
        assert!(repo.get(1).await.is_none());

        let clock = repo.create(1).await;
        assert!(clock.status);

        let stopped = repo.update(1, clock.start, false).await.unwrap();
        assert!(!stopped.status);

        assert!(repo.delete(1).await);
        assert!(repo.get(1).await.is_none());
    }

    #[tokio::test]
    async fn test_working_time_scoped_by_user() {
        let repo = MemoryWorkingTimeRepository::new();
        let now = Utc::now();
        let entry = repo
            .create(
                1,
                NewWorkingTime {
                    start: now,
                    end: now,
                    description: "shift".to_string(),
                },
            )
            .await;

        assert_eq!(repo.list(1).await.len(), 1);
        assert!(repo.list(2).await.is_empty());
        // Wrong owner must not reach another user's entry.
        assert!(repo.get(2, entry.id).await.is_none());
        assert!(!repo.delete(2, entry.id).await);
        assert!(repo.delete(1, entry.id).await);
    }

    #[tokio::test]
    async fn test_team_membership() {
        let repo = MemoryTeamRepository::new();
        repo.create("backend", Some(1)).await.unwrap();

        assert!(matches!(
            repo.create("backend", None).await.unwrap_err(),
            RepositoryError::TeamExists(_)
        ));

        let team = repo.add_user("backend", 2).await.unwrap();
        assert_eq!(team.members_id, vec![2]);
        // Adding twice stays a single membership.
        let team = repo.add_user("backend", 2).await.unwrap();
        assert_eq!(team.members_id, vec![2]);

        assert_eq!(repo.list_for_user(2).await.len(), 1);
        // The owner sees the team too.
        assert_eq!(repo.list_for_user(1).await.len(), 1);
        assert!(repo.is_owner("backend", 1).await);

        let team = repo.remove_user("backend", 2).await.unwrap();
        assert!(team.members_id.is_empty());
    }
}
