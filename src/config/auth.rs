use serde::{Deserialize, Serialize};

/// Authentication configuration: token signing, account rules and the
/// optional bootstrap admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// HS256 signing secret for issued tokens.
    #[serde(default = "default_secret")]
    pub secret: String,

    /// Default token lifetime in seconds.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: i64,

    #[serde(default)]
    pub username: UsernameRules,

    #[serde(default)]
    pub password: PasswordRules,

    /// Admin account created on first start, if configured.
    #[serde(default)]
    pub first_admin: Option<FirstAdmin>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: default_secret(),
            token_ttl_secs: default_token_ttl_secs(),
            username: UsernameRules::default(),
            password: PasswordRules::default(),
            first_admin: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UsernameRules {
    #[serde(default = "default_username_min_length")]
    pub min_length: usize,
}

impl Default for UsernameRules {
    fn default() -> Self {
        Self {
            min_length: default_username_min_length(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PasswordRules {
    #[serde(default = "default_password_min_length")]
    pub min_length: usize,

    /// Salt mixed into every password digest.
    #[serde(default)]
    pub salt: String,

    /// Hash iteration count.
    #[serde(default = "default_rounds")]
    pub rounds: u32,
}

impl Default for PasswordRules {
    fn default() -> Self {
        Self {
            min_length: default_password_min_length(),
            salt: String::new(),
            rounds: default_rounds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FirstAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_admin_role")]
    pub role: String,
}

fn default_secret() -> String {
    // Good enough for local development only; deployments set their own.
    "gotham-dev-secret".to_string()
}

fn default_token_ttl_secs() -> i64 {
    3600
}

fn default_username_min_length() -> usize {
    4
}

fn default_password_min_length() -> usize {
    8
}

fn default_rounds() -> u32 {
    10_000
}

fn default_admin_role() -> String {
    "admin".to_string()
}
