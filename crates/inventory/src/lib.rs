//! Per-site inventory ledger.
//!
//! Business rules for stock levels, implemented purely as deterministic domain logic
//! (no IO, no HTTP, no storage).

pub mod stock;

pub use stock::{StockCommand, StockEvent, StockKey, StockLevel, Withdrawal};
