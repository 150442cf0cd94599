// ============================================================================
// Event Sourcing Core - Generic Abstractions
// ============================================================================
//
// No domain-specific code lives here; everything is generic over the
// aggregate and event types.
//
// ============================================================================

pub mod aggregate;
pub mod event;

pub use aggregate::Aggregate;
pub use event::{DomainEvent, EventEnvelope, serialize_event};
