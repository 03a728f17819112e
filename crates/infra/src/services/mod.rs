//! Application services.
//!
//! Each service composes the store traits with the pure domain aggregates:
//!
//! ```text
//! request
//!   ↓
//! 1. Load current state (or start from an empty aggregate)
//!   ↓
//! 2. Handle the command (pure decision, one event)
//!   ↓
//! 3. Persist the new state
//!   ↓
//! 4. Append the event to the audit log
//! ```
//!
//! Services contain no HTTP; the api crate maps [`ServiceError`] onto status codes.

pub mod access;
pub mod admin;
pub mod catalog;
pub mod inventory;
pub mod reporting;
pub mod work_orders;

use thiserror::Error;

use maintops_auth::{AuthzError, SessionError};
use maintops_core::DomainError;

use crate::store::StoreError;

pub use access::AccessGate;
pub use admin::{Administration, UserView};
pub use catalog::{CatalogService, Page, PageRequest};
pub use inventory::{InventoryLedger, InventoryLine, SiteInventory, SiteInventoryItem};
pub use reporting::{Dashboard, InventoryBreakdown, Reporting, SiteKpi, StatusCount};
pub use work_orders::WorkOrderService;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// No session, bad credentials or a blocked account.
    #[error("unauthorized")]
    Unauthorized,

    /// Authenticated but missing a role.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Duplicate login or role name.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    /// Persistence failure. Never retried.
    #[error("store failure: {0}")]
    Store(String),
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                ServiceError::Validation(msg)
            }
            DomainError::NotFound(entity) => ServiceError::NotFound(entity),
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
            DomainError::Unauthorized => ServiceError::Unauthorized,
            DomainError::Forbidden(msg) => ServiceError::Forbidden(msg),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(entity) => ServiceError::NotFound(entity),
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            StoreError::Domain(err) => err.into(),
            StoreError::Backend(msg) => ServiceError::Store(msg),
        }
    }
}

impl From<SessionError> for ServiceError {
    fn from(value: SessionError) -> Self {
        match value {
            SessionError::Unknown | SessionError::Expired => ServiceError::Unauthorized,
            SessionError::Poisoned => ServiceError::Store(value.to_string()),
        }
    }
}

impl From<AuthzError> for ServiceError {
    fn from(value: AuthzError) -> Self {
        match value {
            AuthzError::Forbidden(role) => ServiceError::Forbidden(format!("missing role '{role}'")),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
