use anyhow::{Result, bail};
use super::event::EventEnvelope;

// ============================================================================
// Aggregate Root Pattern - Event Sourcing Core
// ============================================================================
//
// 1. Commands are validated against current state before anything changes
// 2. Accepted commands produce events; events are the only way state moves
// 3. Replaying a stream reproduces the exact state that produced it
//
// ============================================================================

/// Generic Aggregate trait - all event-sourced aggregates implement this
///
/// Type Parameters:
/// - `Id`: Identifier the aggregate's stream is keyed by
/// - `Event`: The domain event type for this aggregate
/// - `Command`: The command type for this aggregate
/// - `Error`: The error type for business rule violations
pub trait Aggregate: Sized + Send + Sync {
    type Id;
    type Event;
    type Command;
    type Error;

    /// Create new aggregate from first event
    fn apply_first_event(event: &Self::Event) -> Result<Self, Self::Error>;

    /// Apply subsequent events to update state. Bumps `version` by one.
    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error>;

    /// Handle command and emit events (business logic). Never mutates.
    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    fn aggregate_id(&self) -> Self::Id;

    /// Number of events applied so far; the first event yields version 1.
    fn version(&self) -> i64;

    /// Load aggregate from event history (reconstruct from events)
    fn load_from_events<I>(events: &[EventEnvelope<I, Self::Event>]) -> Result<Self>
    where
        Self::Error: std::error::Error + Send + Sync + 'static,
    {
        let Some((first, rest)) = events.split_first() else {
            bail!("No events to load");
        };

        let mut aggregate = Self::apply_first_event(&first.event_data)?;
        check_sequence(first.sequence_number, aggregate.version())?;

        for envelope in rest {
            aggregate.apply_event(&envelope.event_data)?;
            check_sequence(envelope.sequence_number, aggregate.version())?;
        }

        Ok(aggregate)
    }
}

fn check_sequence(recorded: i64, applied: i64) -> Result<()> {
    if recorded != applied {
        bail!("Event stream out of sequence: recorded {}, expected {}", recorded, applied);
    }
    Ok(())
}
