//! Infrastructure layer: stores (in-memory and SQLite), the audit trail, application
//! services and first-start bootstrap.

pub mod audit_log;
pub mod seed;
pub mod services;
pub mod sqlite;
pub mod store;

mod integration_tests;

pub use audit_log::PublishingAuditLog;
pub use services::{ServiceError, ServiceResult};
pub use store::{StoreError, Stores};
