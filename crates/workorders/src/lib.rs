//! Maintenance work-order lifecycle.
//!
//! Pure domain logic: a work order's status, priority, assignment, material-usage lines
//! and comments. Status transitions are intentionally unrestricted; any non-empty status
//! string is accepted.

pub mod kinds;
pub mod lines;
pub mod order;

pub use kinds::{Priority, UnknownVariant, WorkOrderStatus, WorkOrderType};
pub use lines::{MaterialLine, WorkOrderComment, WorkOrderDetail, WorkOrderMaterial};
pub use order::{
    DEFAULT_TITLE, NewWorkOrder, WorkOrder, WorkOrderCommand, WorkOrderEvent, WorkOrderFilter,
    WorkOrderPatch,
};
