pub mod config;
pub mod domain;
pub mod event_sourcing;
pub mod metrics;

pub use config::OrderServiceConfig;
pub use domain::order::{
    ErrorKind, LineId, Order, OrderCommand, OrderCommandHandler, OrderError, OrderId, OrderItem,
    OrderSnapshot, OrderStatus, TableRef,
};
