//! The permission table and its lookup rules.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Matches any resource or any action at its level of the table.
pub const WILDCARD: &str = "*";

/// Reserved role for unauthenticated callers. Whatever this role can do
/// must be spelled out in the table; it is never granted implicitly.
pub const ANONYMOUS_ROLE: &str = "anonymous";

type ActionGrants = HashMap<String, bool>;
type ResourceGrants = HashMap<String, ActionGrants>;

/// role -> resource -> action -> allow.
///
/// Immutable after load; `is_allowed` is a pure query and missing keys of
/// any depth simply mean "no permission".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionTable {
    roles: HashMap<String, ResourceGrants>,
}

impl PermissionTable {
    /// Can `role` perform `action` on `controller`?
    ///
    /// The wildcard resource entry is consulted before the exact resource
    /// entry; within an entry, the wildcard action is consulted before the
    /// exact action. An unknown role is denied everything.
    pub fn is_allowed(&self, role: &str, controller: &str, action: &str) -> bool {
        let Some(grants) = self.roles.get(role) else {
            return false;
        };

        if let Some(any_resource) = grants.get(WILDCARD) {
            return Self::action_allowed(any_resource, action);
        }

        grants
            .get(controller)
            .is_some_and(|actions| Self::action_allowed(actions, action))
    }

    fn action_allowed(actions: &ActionGrants, action: &str) -> bool {
        actions.get(WILDCARD).copied().unwrap_or(false)
            || actions.get(action).copied().unwrap_or(false)
    }

    /// Whether a role exists in the table at all.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains_key(role)
    }

    /// Role names a user may be assigned to, i.e. everything except the
    /// reserved anonymous role.
    pub fn assignable_roles(&self) -> Vec<String> {
        let mut roles: Vec<String> = self
            .roles
            .keys()
            .filter(|role| role.as_str() != ANONYMOUS_ROLE)
            .cloned()
            .collect();
        roles.sort();
        roles
    }

    pub fn insert_role(&mut self, role: impl Into<String>, grants: ResourceGrants) {
        self.roles.insert(role.into(), grants);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(toml: &str) -> PermissionTable {
        ::toml::from_str(toml).expect("invalid permission table")
    }

    #[test]
    fn test_full_wildcard_allows_everything() {
        let table = table(r#"admin = { "*" = { "*" = true } }"#);
        assert!(table.is_allowed("admin", "team", "listTeams"));
        assert!(table.is_allowed("admin", "security", "deleteUser"));
        assert!(table.is_allowed("admin", "anything", "atAll"));
    }

    #[test]
    fn test_resource_wildcard_scoped_to_controller() {
        let table = table(r#"user = { team = { "*" = true } }"#);
        assert!(table.is_allowed("user", "team", "listTeams"));
        assert!(table.is_allowed("user", "team", "deleteTeam"));
        assert!(!table.is_allowed("user", "clock", "getMyClock"));
    }

    #[test]
    fn test_exact_action_grant() {
        let table = table("anonymous = { auth = { login = true } }");
        assert!(table.is_allowed("anonymous", "auth", "login"));
        assert!(!table.is_allowed("anonymous", "auth", "logout"));
        assert!(!table.is_allowed("anonymous", "clock", "login"));
    }

    #[test]
    fn test_unknown_role_denied_everywhere() {
        let table = table(r#"admin = { "*" = { "*" = true } }"#);
        assert!(!table.is_allowed("intern", "team", "listTeams"));
        assert!(!table.is_allowed("", "team", "listTeams"));
    }

    #[test]
    fn test_wildcard_resource_checked_before_exact() {
        // The wildcard entry answers first: it grants only "ping", so the
        // exact team entry is never consulted.
        let table = table(
            r#"
            limited = { "*" = { ping = true }, team = { "*" = true } }
            "#,
        );
        assert!(table.is_allowed("limited", "team", "ping"));
        assert!(!table.is_allowed("limited", "team", "deleteTeam"));
    }

    #[test]
    fn test_false_grant_denies() {
        let table = table("user = { team = { listTeams = false } }");
        assert!(!table.is_allowed("user", "team", "listTeams"));
    }

    #[test]
    fn test_wildcard_action_on_exact_resource() {
        let table = table(r#"user = { "*" = { listTeams = true } }"#);
        assert!(table.is_allowed("user", "clock", "listTeams"));
        assert!(!table.is_allowed("user", "clock", "getMyClock"));
    }

    #[test]
    fn test_assignable_roles_excludes_anonymous() {
        let table = table(
            r#"
            anonymous = { auth = { login = true } }
            user = { clock = { "*" = true } }
            admin = { "*" = { "*" = true } }
            "#,
        );
        assert_eq!(table.assignable_roles(), vec!["admin", "user"]);
        assert!(table.has_role("anonymous"));
    }
}
