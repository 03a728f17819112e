use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use maintops_auth::{Actor, LoginEvent, Role, SessionStore, SessionToken, require_role};
use maintops_core::UserId;

use super::{ServiceError, ServiceResult};
use crate::audit_log::record;
use crate::store::{AuditLog, Stores, UserStore};

/// Resolves session tokens to actors and enforces role checks.
#[derive(Clone)]
pub struct AccessGate {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    audit: Arc<dyn AuditLog>,
}

impl AccessGate {
    pub fn new(stores: &Stores, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            users: stores.users.clone(),
            sessions,
            audit: stores.audit.clone(),
        }
    }

    /// Verify credentials and mint a session. Nothing is minted on failure.
    pub async fn login(&self, login: &str, password: &str) -> ServiceResult<SessionToken> {
        let Some(user) = self.users.find_user_by_login(login).await? else {
            warn!(login, "login rejected: unknown login");
            return Err(ServiceError::Unauthorized);
        };
        if !user.accepts(password) {
            warn!(login, blocked = user.blocked, "login rejected");
            return Err(ServiceError::Unauthorized);
        }

        let token = self.sessions.issue(user.id)?;
        record(
            self.audit.as_ref(),
            &LoginEvent {
                user_id: user.id,
                login: user.login.clone(),
                occurred_at: Utc::now(),
            },
        )
        .await?;
        info!(user_id = %user.id, login = %user.login, "login");
        Ok(token)
    }

    /// The live actor behind `token`. Deleted or blocked accounts do not resolve.
    pub async fn resolve(&self, token: &str) -> ServiceResult<Actor> {
        let user_id = self.sessions.resolve(token)?;
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or(ServiceError::Unauthorized)?;
        if user.blocked {
            return Err(ServiceError::Unauthorized);
        }
        let roles = self.users.user_roles(user_id).await?;
        Ok(user.actor(roles))
    }

    /// Idempotent; unknown tokens are ignored.
    pub fn logout(&self, token: &str) -> ServiceResult<()> {
        self.sessions.revoke(token)?;
        Ok(())
    }

    /// Drop every session of a user.
    pub fn revoke_user(&self, user_id: UserId) -> ServiceResult<usize> {
        Ok(self.sessions.revoke_user(user_id)?)
    }

    /// Check `role` against the actor's current role set, reloaded from the store.
    pub async fn require_role(&self, actor: &Actor, role: &Role) -> ServiceResult<()> {
        let roles = self.users.user_roles(actor.id).await?;
        require_role(&roles, role).inspect_err(|_| {
            warn!(user_id = %actor.id, role = %role, "access denied");
        })?;
        Ok(())
    }
}
