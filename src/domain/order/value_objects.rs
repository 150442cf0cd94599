use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Order Value Objects
// ============================================================================

/// Process-unique order identifier handed out by an [`OrderIdSequencer`].
///
/// [`OrderIdSequencer`]: super::sequencer::OrderIdSequencer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u64);

impl OrderId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Non-owning reference to a table managed by the table store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableRef(String);

impl TableRef {
    pub fn new(table: impl Into<String>) -> Self {
        Self(table.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A reference is usable when it names something.
    pub fn is_valid(&self) -> bool {
        !self.0.trim().is_empty()
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to a menu entry; the menu itself lives elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MenuItemRef(String);

impl MenuItemRef {
    pub fn new(menu_item: impl Into<String>) -> Self {
        Self(menu_item.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MenuItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub menu_item: MenuItemRef,
    pub quantity: u32,
}

impl OrderItem {
    pub fn new(menu_item: impl Into<String>, quantity: u32) -> Self {
        Self {
            menu_item: MenuItemRef::new(menu_item),
            quantity,
        }
    }
}

impl fmt::Display for OrderItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.menu_item, self.quantity)
    }
}

/// Order-local handle for one entry of the item list. Never reused within an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(pub u32);

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub line_id: LineId,
    pub item: OrderItem,
}

// ============================================================================
// Order Status - Lifecycle State Machine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Open,
    Confirmed,
    Preparing,
    Served,
    Paid,
    Cancelled,
}

/// Every legal `(from, to)` edge of the order lifecycle.
pub const TRANSITIONS: &[(OrderStatus, OrderStatus)] = &[
    (OrderStatus::Open, OrderStatus::Confirmed),
    (OrderStatus::Confirmed, OrderStatus::Preparing),
    (OrderStatus::Preparing, OrderStatus::Served),
    (OrderStatus::Served, OrderStatus::Paid),
    (OrderStatus::Open, OrderStatus::Cancelled),
    (OrderStatus::Confirmed, OrderStatus::Cancelled),
    (OrderStatus::Preparing, OrderStatus::Cancelled),
];

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Open,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Served,
        OrderStatus::Paid,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Open => "OPEN",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Served => "SERVED",
            OrderStatus::Paid => "PAID",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn can_transition_to(self, to: OrderStatus) -> bool {
        TRANSITIONS.iter().any(|&(f, t)| f == self && t == to)
    }

    /// Next step of the kitchen/billing happy path.
    ///
    /// `Open` has no entry here: leaving `Open` goes through confirmation,
    /// which has its own item check.
    pub fn advance_target(self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Confirmed => Some(OrderStatus::Preparing),
            OrderStatus::Preparing => Some(OrderStatus::Served),
            OrderStatus::Served => Some(OrderStatus::Paid),
            OrderStatus::Open | OrderStatus::Paid | OrderStatus::Cancelled => None,
        }
    }

    pub fn can_cancel(self) -> bool {
        self.can_transition_to(OrderStatus::Cancelled)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Cancelled)
    }

    pub fn is_open(self) -> bool {
        self == OrderStatus::Open
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
