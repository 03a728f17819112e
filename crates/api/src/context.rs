use maintops_auth::Actor;
use maintops_core::UserId;

/// Session context for a request (the authenticated actor).
///
/// Inserted by the session middleware; present for every protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    actor: Actor,
}

impl SessionContext {
    pub fn new(actor: Actor) -> Self {
        Self { actor }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn user_id(&self) -> UserId {
        self.actor.id
    }
}
