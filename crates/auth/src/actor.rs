use serde::{Deserialize, Serialize};

use maintops_core::UserId;

use crate::Role;

/// Resolved identity of the caller behind a session.
///
/// Carries no credential material; safe to serialize back to clients (`/auth/me`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub login: String,
    pub email: Option<String>,
    pub roles: Vec<Role>,
    pub blocked: bool,
}

impl Actor {
    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(&Role::ADMIN)
    }
}
