//! User accounts and the audit events of identity administration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use maintops_core::{DomainError, RoleId, UserId};
use maintops_events::{Event, Severity};

use crate::{Actor, PasswordHash, Role};

/// Stored user account. Role links are kept by the store, not on the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub id: UserId,
    pub login: String,
    pub email: Option<String>,
    pub password_hash: PasswordHash,
    pub blocked: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub login: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Partial update; absent fields are left unchanged.
///
/// An empty password is treated as absent. `roles`, when present, replaces the full
/// role set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub blocked: Option<bool>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

impl UserAccount {
    pub fn register(input: &NewUser, created_at: DateTime<Utc>) -> Result<Self, DomainError> {
        let login = input.login.trim();
        if login.is_empty() {
            return Err(DomainError::validation("login must not be empty"));
        }
        if input.password.is_empty() {
            return Err(DomainError::validation("password must not be empty"));
        }

        Ok(Self {
            id: UserId::new(),
            login: login.to_string(),
            email: input.email.clone(),
            password_hash: PasswordHash::create(&input.password),
            blocked: false,
            created_at,
        })
    }

    pub fn apply_patch(&mut self, patch: &UserPatch) {
        if let Some(email) = &patch.email {
            self.email = Some(email.clone());
        }
        if let Some(blocked) = patch.blocked {
            self.blocked = blocked;
        }
        if let Some(password) = patch.password.as_deref().filter(|p| !p.is_empty()) {
            self.password_hash = PasswordHash::create(password);
        }
    }

    /// Whether `password` unlocks this account. Blocked accounts never do.
    pub fn accepts(&self, password: &str) -> bool {
        !self.blocked && self.password_hash.verify(password)
    }

    pub fn actor(&self, roles: Vec<Role>) -> Actor {
        Actor {
            id: self.id,
            login: self.login.clone(),
            email: self.email.clone(),
            roles,
            blocked: self.blocked,
        }
    }
}

/// Parse role names, dropping duplicates while keeping first-seen order.
pub fn normalize_role_names(names: &[String]) -> Result<Vec<Role>, DomainError> {
    let mut out: Vec<Role> = Vec::with_capacity(names.len());
    for name in names {
        let role = Role::parse(name)?;
        if !out.contains(&role) {
            out.push(role);
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserEvent {
    Created {
        user_id: UserId,
        login: String,
        occurred_at: DateTime<Utc>,
    },
    Updated {
        user_id: UserId,
        login: String,
        occurred_at: DateTime<Utc>,
    },
    Deleted {
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    },
}

impl UserEvent {
    fn user_id(&self) -> UserId {
        match self {
            UserEvent::Created { user_id, .. }
            | UserEvent::Updated { user_id, .. }
            | UserEvent::Deleted { user_id, .. } => *user_id,
        }
    }
}

impl Event for UserEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UserEvent::Created { .. } => "user_created",
            UserEvent::Updated { .. } => "user_updated",
            UserEvent::Deleted { .. } => "user_deleted",
        }
    }

    fn severity(&self) -> Severity {
        match self {
            UserEvent::Created { .. } => Severity::Success,
            UserEvent::Updated { .. } => Severity::Info,
            UserEvent::Deleted { .. } => Severity::Danger,
        }
    }

    fn describe(&self) -> String {
        match self {
            UserEvent::Created { login, .. } => format!("User {login} created"),
            UserEvent::Updated { login, .. } => format!("User {login} updated"),
            UserEvent::Deleted { user_id, .. } => format!("User #{user_id} deleted"),
        }
    }

    fn metadata(&self) -> Option<JsonValue> {
        Some(json!({ "user_id": self.user_id().to_string() }))
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            UserEvent::Created { occurred_at, .. }
            | UserEvent::Updated { occurred_at, .. }
            | UserEvent::Deleted { occurred_at, .. } => *occurred_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoleEvent {
    Created {
        role_id: RoleId,
        name: Role,
        occurred_at: DateTime<Utc>,
    },
    Renamed {
        role_id: RoleId,
        name: Role,
        occurred_at: DateTime<Utc>,
    },
    Deleted {
        role_id: RoleId,
        occurred_at: DateTime<Utc>,
    },
}

impl Event for RoleEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RoleEvent::Created { .. } => "role_created",
            RoleEvent::Renamed { .. } => "role_updated",
            RoleEvent::Deleted { .. } => "role_deleted",
        }
    }

    fn severity(&self) -> Severity {
        match self {
            RoleEvent::Created { .. } => Severity::Success,
            RoleEvent::Renamed { .. } => Severity::Info,
            RoleEvent::Deleted { .. } => Severity::Danger,
        }
    }

    fn describe(&self) -> String {
        match self {
            RoleEvent::Created { name, .. } => format!("Role {name} created"),
            RoleEvent::Renamed { role_id, name, .. } => format!("Role #{role_id} renamed to {name}"),
            RoleEvent::Deleted { role_id, .. } => format!("Role #{role_id} deleted"),
        }
    }

    fn metadata(&self) -> Option<JsonValue> {
        let role_id = match self {
            RoleEvent::Created { role_id, .. }
            | RoleEvent::Renamed { role_id, .. }
            | RoleEvent::Deleted { role_id, .. } => role_id,
        };
        Some(json!({ "role_id": role_id.to_string() }))
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RoleEvent::Created { occurred_at, .. }
            | RoleEvent::Renamed { occurred_at, .. }
            | RoleEvent::Deleted { occurred_at, .. } => *occurred_at,
        }
    }
}

/// Successful login.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginEvent {
    pub user_id: UserId,
    pub login: String,
    pub occurred_at: DateTime<Utc>,
}

impl Event for LoginEvent {
    fn event_type(&self) -> &'static str {
        "auth_login"
    }

    fn severity(&self) -> Severity {
        Severity::Success
    }

    fn describe(&self) -> String {
        format!("Login: {}", self.login)
    }

    fn metadata(&self) -> Option<JsonValue> {
        Some(json!({ "user_id": self.user_id.to_string() }))
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
