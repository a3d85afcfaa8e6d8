//! Configuration module.
//!
//! The backend is configured via a TOML file. All sections are optional
//! with defaults suitable for local development.
//!
//! # Example
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 4000
//!
//! [auth]
//! secret = "change-me"
//! token_ttl_secs = 3600
//!
//! [permissions.anonymous.auth]
//! login = true
//! register = true
//!
//! [rate_limits.auth]
//! login = 3
//! ```

mod auth;
mod limits;
mod server;

use std::path::Path;

pub use auth::{AuthConfig, FirstAdmin, PasswordRules, UsernameRules};
pub use limits::RateLimitsConfig;
use serde::{Deserialize, Serialize};
pub use server::ServerConfig;
use thiserror::Error;

use crate::authz::{ANONYMOUS_ROLE, PermissionTable, WILDCARD};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    /// The permission table. When omitted entirely, a conservative default
    /// is used; when present it replaces the default wholesale.
    #[serde(default = "default_permissions")]
    pub permissions: PermissionTable,

    #[serde(default)]
    pub rate_limits: RateLimitsConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            permissions: default_permissions(),
            rate_limits: RateLimitsConfig::default(),
        }
    }
}

impl BackendConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.secret.is_empty() {
            return Err(ConfigError::Invalid("auth.secret must not be empty".into()));
        }
        if self.auth.token_ttl_secs <= 0 {
            return Err(ConfigError::Invalid(
                "auth.token_ttl_secs must be positive".into(),
            ));
        }
        // Anonymous access must be enumerated per controller; a wildcard
        // resource grant for anonymous is a configuration mistake.
        if self
            .permissions
            .is_allowed(ANONYMOUS_ROLE, WILDCARD, WILDCARD)
        {
            return Err(ConfigError::Invalid(
                "the anonymous role must not be granted wildcard access".into(),
            ));
        }
        Ok(())
    }
}

/// What unconfigured deployments get: anonymous callers can only sign in
/// or register, users can manage their own time, admins can do anything.
fn default_permissions() -> PermissionTable {
    const DEFAULT_PERMISSIONS: &str = r#"
        [anonymous.auth]
        login = true
        register = true
        checkToken = true

        [user.auth]
        "*" = true

        [user.clock]
        getMyClock = true
        createOrUpdateMyClock = true
        deleteMyClock = true

        [user.workingtime]
        listMyWorkingTimes = true
        getMyWorkingTime = true
        createMyWorkingTime = true
        updateMyWorkingTime = true
        deleteMyWorkingTime = true

        [user.team]
        listTeams = true
        getTeamByName = true
        createOwnedTeam = true
        deleteOwnedTeam = true
        listOwnedTeams = true
        getOwnedTeamByName = true
        addOwnedTeamUser = true
        removeOwnedTeamUser = true

        ["admin"."*"]
        "*" = true
    "#;
    toml::from_str(DEFAULT_PERMISSIONS).expect("default permission table must parse")
}
