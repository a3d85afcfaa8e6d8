//! Domain models shared between controllers and repositories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user account. The password digest never leaves the repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
}

/// The single clock a user owns. `status` is true while the user is
/// clocked in; `start` is when the current (or next) period began.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clock {
    pub user_id: i64,
    pub start: DateTime<Utc>,
    pub status: bool,
}

/// A recorded working period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingTime {
    pub id: i64,
    pub user_id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
}

/// A team, identified by its unique name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    pub owner_id: Option<i64>,
    pub members_id: Vec<i64>,
}
