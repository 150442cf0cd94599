use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::event_sourcing::core::DomainEvent;
use super::value_objects::{LineId, OrderId, OrderLine, OrderStatus, TableRef};

// ============================================================================
// Order Events - Facts recorded for each accepted command
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    Opened(OrderOpened),
    ItemAdded(OrderItemAdded),
    ItemRemoved(OrderItemRemoved),
    Confirmed(OrderConfirmed),
    Advanced(OrderAdvanced),
    Cancelled(OrderCancelled),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::Opened(_) => "OrderOpened",
            OrderEvent::ItemAdded(_) => "OrderItemAdded",
            OrderEvent::ItemRemoved(_) => "OrderItemRemoved",
            OrderEvent::Confirmed(_) => "OrderConfirmed",
            OrderEvent::Advanced(_) => "OrderAdvanced",
            OrderEvent::Cancelled(_) => "OrderCancelled",
        }
    }
}

impl OrderEvent {
    /// Status the order is in once this event has been applied, if it changes it.
    pub fn resulting_status(&self) -> Option<OrderStatus> {
        match self {
            OrderEvent::Opened(_) => Some(OrderStatus::Open),
            OrderEvent::Confirmed(_) => Some(OrderStatus::Confirmed),
            OrderEvent::Advanced(e) => Some(e.to),
            OrderEvent::Cancelled(_) => Some(OrderStatus::Cancelled),
            OrderEvent::ItemAdded(_) | OrderEvent::ItemRemoved(_) => None,
        }
    }
}

// ============================================================================
// Individual Event Types
// ============================================================================

/// Table requested service; always the first event of a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderOpened {
    pub order_id: OrderId,
    pub table: TableRef,
    pub lines: Vec<OrderLine>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemAdded {
    pub line: OrderLine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemRemoved {
    pub line_id: LineId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderConfirmed {
    pub confirmed_at: DateTime<Utc>,
}

/// One step along the kitchen/billing path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAdvanced {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub advanced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub from: OrderStatus,
    pub cancelled_at: DateTime<Utc>,
}
