//! Repository traits and their errors.
//!
//! The funnel and the controllers depend on these traits only; the
//! concrete store behind them is wiring. The in-memory implementations in
//! [`memory`] back the default single-node deployment and the tests.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use memory::{
    MemoryClockRepository, MemoryTeamRepository, MemoryUserRepository,
    MemoryWorkingTimeRepository,
};

use crate::models::{Clock, Team, User, WorkingTime};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("username already taken")]
    UsernameTaken,

    #[error("email already taken")]
    EmailTaken,

    #[error("team {0} already exists")]
    TeamExists(String),

    #[error("user {0} not found")]
    UserNotFound(i64),
}

/// Fields for a new user account. The password arrives in clear and is
/// hashed by the repository.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

/// Partial user update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewWorkingTime {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct WorkingTimeUpdate {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

/// The narrow read side the authorization gate depends on: look a user up
/// to learn their current role.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: i64) -> Option<User>;
}

#[async_trait]
pub trait UserRepository: UserDirectory {
    async fn create(&self, new: NewUser) -> Result<User, RepositoryError>;

    /// Check a username/password pair. `None` on any mismatch; the caller
    /// must not learn which half was wrong.
    async fn verify(&self, username: &str, password: &str) -> Option<User>;

    async fn list(&self) -> Vec<User>;

    async fn update(&self, id: i64, update: UserUpdate) -> Result<Option<User>, RepositoryError>;

    async fn delete(&self, id: i64) -> bool;
}

#[async_trait]
pub trait ClockRepository: Send + Sync {
    async fn get(&self, user_id: i64) -> Option<Clock>;

    /// Create a running clock starting now.
    async fn create(&self, user_id: i64) -> Clock;

    async fn update(&self, user_id: i64, start: DateTime<Utc>, status: bool) -> Option<Clock>;

    async fn delete(&self, user_id: i64) -> bool;
}

#[async_trait]
pub trait WorkingTimeRepository: Send + Sync {
    async fn list(&self, user_id: i64) -> Vec<WorkingTime>;

    async fn get(&self, user_id: i64, work_id: i64) -> Option<WorkingTime>;

    async fn create(&self, user_id: i64, new: NewWorkingTime) -> WorkingTime;

    async fn update(
        &self,
        user_id: i64,
        work_id: i64,
        update: WorkingTimeUpdate,
    ) -> Option<WorkingTime>;

    async fn delete(&self, user_id: i64, work_id: i64) -> bool;
}

#[async_trait]
pub trait TeamRepository: Send + Sync {
    async fn create(&self, name: &str, owner_id: Option<i64>) -> Result<Team, RepositoryError>;

    async fn list(&self) -> Vec<Team>;

    async fn get(&self, name: &str) -> Option<Team>;

    async fn delete(&self, name: &str) -> bool;

    /// Add a member; adding twice is a no-op. `None` when the team does
    /// not exist.
    async fn add_user(&self, name: &str, user_id: i64) -> Option<Team>;

    async fn remove_user(&self, name: &str, user_id: i64) -> Option<Team>;

    async fn list_for_user(&self, user_id: i64) -> Vec<Team>;

    async fn is_owner(&self, name: &str, user_id: i64) -> bool;
}
