use thiserror::Error;

use crate::Role;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing role '{0}'")]
    Forbidden(String),
}

/// Check that `required` is among `roles`.
///
/// - No IO
/// - No panics
/// - Pure policy check; callers load the role set.
pub fn require_role(roles: &[Role], required: &Role) -> Result<(), AuthzError> {
    if roles.iter().any(|r| r == required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_passes_admin_check() {
        let roles = vec![Role::new("planner"), Role::ADMIN];
        assert!(require_role(&roles, &Role::ADMIN).is_ok());
    }

    #[test]
    fn missing_role_is_forbidden() {
        let roles = vec![Role::new("maintainer")];
        assert_eq!(
            require_role(&roles, &Role::ADMIN),
            Err(AuthzError::Forbidden("admin".to_string()))
        );
        assert!(require_role(&[], &Role::ADMIN).is_err());
    }
}
