//! User and role administration. Every operation requires the `admin` role, checked
//! here rather than only at the HTTP edge.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use maintops_auth::{
    Actor, NewUser, Role, RoleEvent, RoleRecord, UserAccount, UserEvent, UserPatch,
    normalize_role_names,
};
use maintops_core::{RoleId, UserId};

use super::{AccessGate, ServiceError, ServiceResult};
use crate::audit_log::record;
use crate::store::{AuditLog, Stores, UserStore};

/// A user as shown to administrators. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub login: String,
    pub email: Option<String>,
    pub blocked: bool,
    pub created_at: DateTime<Utc>,
    pub roles: Vec<Role>,
}

impl UserView {
    fn new(user: UserAccount, roles: Vec<Role>) -> Self {
        Self {
            id: user.id,
            login: user.login,
            email: user.email,
            blocked: user.blocked,
            created_at: user.created_at,
            roles,
        }
    }
}

#[derive(Clone)]
pub struct Administration {
    users: Arc<dyn UserStore>,
    audit: Arc<dyn AuditLog>,
    gate: AccessGate,
}

impl Administration {
    pub fn new(stores: &Stores, gate: AccessGate) -> Self {
        Self {
            users: stores.users.clone(),
            audit: stores.audit.clone(),
            gate,
        }
    }

    async fn require_admin(&self, actor: &Actor) -> ServiceResult<()> {
        self.gate.require_role(actor, &Role::ADMIN).await
    }

    pub async fn list_users(&self, actor: &Actor) -> ServiceResult<Vec<UserView>> {
        self.require_admin(actor).await?;
        let mut out = Vec::new();
        for user in self.users.list_users().await? {
            let roles = self.users.user_roles(user.id).await?;
            out.push(UserView::new(user, roles));
        }
        Ok(out)
    }

    /// Unknown role names are created on the fly.
    pub async fn create_user(&self, actor: &Actor, input: NewUser) -> ServiceResult<UserId> {
        self.require_admin(actor).await?;
        let roles = normalize_role_names(&input.roles)?;
        let user = UserAccount::register(&input, Utc::now())?;

        self.users.insert_user(&user).await?;
        self.users.set_user_roles(user.id, &roles).await?;
        record(
            self.audit.as_ref(),
            &UserEvent::Created {
                user_id: user.id,
                login: user.login.clone(),
                occurred_at: user.created_at,
            },
        )
        .await?;
        info!(user_id = %user.id, login = %user.login, "user created");
        Ok(user.id)
    }

    /// Blocking an account also drops its live sessions.
    pub async fn update_user(
        &self,
        actor: &Actor,
        id: UserId,
        patch: UserPatch,
    ) -> ServiceResult<()> {
        self.require_admin(actor).await?;
        let roles = patch
            .roles
            .as_deref()
            .map(normalize_role_names)
            .transpose()?;
        let mut user = self
            .users
            .get_user(id)
            .await?
            .ok_or(ServiceError::NotFound("user"))?;

        user.apply_patch(&patch);
        self.users.update_user(&user).await?;
        if let Some(roles) = roles {
            self.users.set_user_roles(id, &roles).await?;
        }
        if user.blocked {
            self.gate.revoke_user(id)?;
        }
        record(
            self.audit.as_ref(),
            &UserEvent::Updated {
                user_id: id,
                login: user.login.clone(),
                occurred_at: Utc::now(),
            },
        )
        .await?;
        info!(user_id = %id, "user updated");
        Ok(())
    }

    /// Idempotent: deleting an unknown user records nothing.
    pub async fn delete_user(&self, actor: &Actor, id: UserId) -> ServiceResult<()> {
        self.require_admin(actor).await?;
        if !self.users.delete_user(id).await? {
            return Ok(());
        }
        self.gate.revoke_user(id)?;
        record(
            self.audit.as_ref(),
            &UserEvent::Deleted {
                user_id: id,
                occurred_at: Utc::now(),
            },
        )
        .await?;
        info!(user_id = %id, "user deleted");
        Ok(())
    }

    pub async fn list_roles(&self, actor: &Actor) -> ServiceResult<Vec<RoleRecord>> {
        self.require_admin(actor).await?;
        Ok(self.users.list_roles().await?)
    }

    pub async fn create_role(&self, actor: &Actor, name: &str) -> ServiceResult<RoleId> {
        self.require_admin(actor).await?;
        let role = RoleRecord::new(Role::parse(name)?);
        self.users.insert_role(&role).await?;
        record(
            self.audit.as_ref(),
            &RoleEvent::Created {
                role_id: role.id,
                name: role.name.clone(),
                occurred_at: Utc::now(),
            },
        )
        .await?;
        Ok(role.id)
    }

    pub async fn rename_role(&self, actor: &Actor, id: RoleId, name: &str) -> ServiceResult<()> {
        self.require_admin(actor).await?;
        let name = Role::parse(name)?;
        if self.users.get_role(id).await?.is_none() {
            return Err(ServiceError::NotFound("role"));
        }
        self.users.rename_role(id, &name).await?;
        record(
            self.audit.as_ref(),
            &RoleEvent::Renamed {
                role_id: id,
                name,
                occurred_at: Utc::now(),
            },
        )
        .await?;
        Ok(())
    }

    /// Removes every assignment of the role too. Idempotent.
    pub async fn delete_role(&self, actor: &Actor, id: RoleId) -> ServiceResult<()> {
        self.require_admin(actor).await?;
        if self.users.delete_role(id).await? {
            record(
                self.audit.as_ref(),
                &RoleEvent::Deleted {
                    role_id: id,
                    occurred_at: Utc::now(),
                },
            )
            .await?;
        }
        Ok(())
    }
}
