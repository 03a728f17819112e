//! Aggregate root trait for state-stored domain models.

/// Aggregate root marker + minimal interface.
///
/// Aggregates here are persisted as current state (not as event streams); the events
/// they emit feed the audit trail.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;
}

/// Aggregate execution semantics (pure, deterministic).
///
/// - **Decision logic**: `handle(&self, cmd)` returns events.
/// - **State mutation**: `apply(&mut self, event)` evolves state.
///
/// Aggregates must not perform IO or side effects. Every accepted command yields
/// exactly one event, which is what the audit trail records for the mutation.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Evolve in-memory state from a single event.
    fn apply(&mut self, event: &Self::Event);

    /// Decide which event to emit given the current state and a command.
    ///
    /// This must not mutate state. State evolution is done through `apply`.
    fn handle(&self, command: &Self::Command) -> Result<Self::Event, Self::Error>;

    /// Convenience: decide and apply in one step, returning the applied event.
    fn execute(&mut self, command: &Self::Command) -> Result<Self::Event, Self::Error> {
        let event = self.handle(command)?;
        self.apply(&event);
        Ok(event)
    }
}
