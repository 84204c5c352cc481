//! Roles, capabilities and the per-request `Identity` snapshot.
//!
//! Store role strings are free-form (`USER`, `ROLE_ADMIN`, ...). They are mapped
//! once, at resolve time, onto the closed `Role` enum; nothing downstream ever
//! compares role strings.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Role::User => 0b01,
            Role::Admin => 0b10,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a role set allows its holder to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Read and mutate resources the holder owns.
    AccessOwnResources,
    /// Skip the ownership check on any resource.
    BypassOwnership,
}

/// Set of roles held by an identity. Always contains `Role::User`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RoleSet(u8);

impl RoleSet {
    pub fn user() -> Self {
        Self(Role::User.bit())
    }

    #[cfg(test)]
    pub fn admin() -> Self {
        Self(Role::User.bit() | Role::Admin.bit())
    }

    pub fn from_roles(roles: impl IntoIterator<Item = Role>) -> Self {
        roles
            .into_iter()
            .fold(Self::user(), |set, role| Self(set.0 | role.bit()))
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    pub fn is_admin(&self) -> bool {
        self.contains(Role::Admin)
    }

    pub fn grants(&self, capability: Capability) -> bool {
        match capability {
            Capability::AccessOwnResources => self.contains(Role::User),
            Capability::BypassOwnership => self.contains(Role::Admin),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        [Role::User, Role::Admin]
            .into_iter()
            .filter(|role| self.contains(*role))
    }

    pub fn to_vec(&self) -> Vec<Role> {
        self.iter().collect()
    }
}

impl fmt::Debug for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Maps role names from the user store onto `Role`.
#[derive(Debug, Clone)]
pub struct RoleMapping {
    admin_role: String,
}

impl RoleMapping {
    pub fn new(admin_role: impl Into<String>) -> Self {
        Self {
            admin_role: admin_role.into(),
        }
    }

    pub fn admin_role(&self) -> &str {
        &self.admin_role
    }

    /// `ROLE_` prefixes are accepted; unknown names yield `None`.
    pub fn parse(&self, raw: &str) -> Option<Role> {
        let name = raw.trim();
        let name = name.strip_prefix("ROLE_").unwrap_or(name);

        if name.eq_ignore_ascii_case(&self.admin_role) {
            Some(Role::Admin)
        } else if name.eq_ignore_ascii_case(Role::User.as_str()) {
            Some(Role::User)
        } else {
            None
        }
    }

    pub fn role_set<'a>(&self, raw: impl IntoIterator<Item = &'a str>) -> RoleSet {
        RoleSet::from_roles(raw.into_iter().filter_map(|name| {
            let role = self.parse(name);
            if role.is_none() {
                tracing::debug!(role = %name, "ignoring unknown role from user store");
            }
            role
        }))
    }
}

impl Default for RoleMapping {
    fn default() -> Self {
        Self::new(Role::Admin.as_str())
    }
}

/// Verified caller for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub roles: RoleSet,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.roles.is_admin()
    }
}
