//! `maintops-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! strongly-typed identifiers, the domain error model and the aggregate contract
//! shared by the work-order, inventory and catalog modules.

pub mod aggregate;
pub mod error;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot};
pub use error::{DomainError, DomainResult};
pub use id::{
    CommentId, EquipmentId, EventId, MaterialId, MaterialLineId, RoleId, SiteId, UserId,
    WorkOrderId,
};
