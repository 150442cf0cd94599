// ============================================================================
// Order Domain - Lifecycle of one restaurant order
// ============================================================================
//
// - Value objects (OrderId, TableRef, OrderItem, OrderStatus + transition table)
// - Events, commands and business rule errors
// - Order aggregate and its persistence snapshot
// - Id sequencer handed to the aggregate on creation
// - Command handler (store + logging + metrics around the aggregate)
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod commands;
pub mod errors;
pub mod sequencer;
pub mod snapshot;
pub mod aggregate;
pub mod command_handler;

pub use value_objects::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use sequencer::*;
pub use snapshot::*;
pub use aggregate::*;
pub use command_handler::*;
