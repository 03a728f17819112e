//! Audit events: the event contract, audit records and in-process distribution.

pub mod bus;
pub mod event;
pub mod in_memory_bus;
pub mod record;

pub use bus::{EventBus, Subscription};
pub use event::{Event, Severity, UnknownSeverity};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use record::{AuditRecord, NewAuditRecord, DEFAULT_RECENT_LIMIT};
