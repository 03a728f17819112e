use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use maintops_core::{DomainError, RoleId};

/// Role names seeded on first start.
pub const BUILTIN_ROLES: [&str; 4] = ["admin", "planner", "maintainer", "procurement"];

/// Role name used for access checks.
///
/// Roles are opaque strings at this layer; only `admin` carries meaning (it gates user
/// and role administration).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Trimmed, non-empty role name.
    pub fn parse(name: &str) -> Result<Self, DomainError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("role name must not be empty"));
        }
        Ok(Self(Cow::Owned(trimmed.to_string())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored role definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub id: RoleId,
    pub name: Role,
}

impl RoleRecord {
    pub fn new(name: Role) -> Self {
        Self {
            id: RoleId::new(),
            name,
        }
    }
}
