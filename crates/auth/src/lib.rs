//! `maintops-auth`: identities, sessions and role checks.
//!
//! This crate is decoupled from HTTP and storage; stores live in `maintops-infra`.

pub mod actor;
pub mod authorize;
pub mod password;
pub mod roles;
pub mod session;
pub mod user;

pub use actor::Actor;
pub use authorize::{AuthzError, require_role};
pub use password::{PasswordError, PasswordHash};
pub use roles::{BUILTIN_ROLES, Role, RoleRecord};
pub use session::{InMemorySessionStore, SessionError, SessionStore, SessionToken};
pub use user::{
    LoginEvent, NewUser, RoleEvent, UserAccount, UserEvent, UserPatch, normalize_role_names,
};
