use super::value_objects::{LineId, OrderItem};

// ============================================================================
// Order Commands - Represent staff intent on an existing order
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderCommand {
    AddItem {
        item: OrderItem,
    },
    RemoveItem {
        line_id: LineId,
    },
    ConfirmOrder,
    AdvanceOrder,
    CancelOrder,
}

impl OrderCommand {
    /// Verb used in logs, metrics labels and error messages.
    pub fn operation(&self) -> &'static str {
        match self {
            OrderCommand::AddItem { .. } => "add item to",
            OrderCommand::RemoveItem { .. } => "remove item from",
            OrderCommand::ConfirmOrder => "confirm",
            OrderCommand::AdvanceOrder => "advance",
            OrderCommand::CancelOrder => "cancel",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OrderCommand::AddItem { .. } => "AddItem",
            OrderCommand::RemoveItem { .. } => "RemoveItem",
            OrderCommand::ConfirmOrder => "ConfirmOrder",
            OrderCommand::AdvanceOrder => "AdvanceOrder",
            OrderCommand::CancelOrder => "CancelOrder",
        }
    }
}
