use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::OrderError;
use super::value_objects::{OrderId, OrderLine, OrderStatus, TableRef};

// ============================================================================
// Order Snapshot - full externally visible state, for persistence
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub order_id: OrderId,
    pub table: TableRef,
    pub status: OrderStatus,
    pub items: Vec<OrderLine>,
    pub create_time: DateTime<Utc>,

    /// Next line id to hand out. Older snapshots omit it; it is then derived
    /// from the highest line id present.
    #[serde(default)]
    pub next_line_id: u32,
    #[serde(default)]
    pub version: i64,
}

impl OrderSnapshot {
    /// Check every invariant a live order upholds. Returns the next line id.
    pub(crate) fn validate(&self) -> Result<u32, OrderError> {
        if !self.table.is_valid() {
            return Err(OrderError::InvalidTable);
        }

        if !self.status.is_open() && self.items.is_empty() {
            return Err(OrderError::InvalidSnapshot(format!(
                "status {} requires at least one item",
                self.status
            )));
        }

        let mut seen = HashSet::with_capacity(self.items.len());
        for line in &self.items {
            super::aggregate::validate_item(&line.item)?;
            if line.line_id.0 == 0 || !seen.insert(line.line_id) {
                return Err(OrderError::InvalidSnapshot(format!(
                    "bad or duplicate line id {}",
                    line.line_id
                )));
            }
        }

        let mut derived = 1;
        for line in &self.items {
            let after = line.line_id.0.checked_add(1).ok_or_else(|| {
                OrderError::InvalidSnapshot(format!("line id {} out of range", line.line_id))
            })?;
            derived = derived.max(after);
        }

        if self.next_line_id == u32::MAX {
            return Err(OrderError::InvalidSnapshot("next line id out of range".to_string()));
        }
        if self.next_line_id != 0 && self.next_line_id < derived {
            return Err(OrderError::InvalidSnapshot(format!(
                "next line id {} already in use",
                self.next_line_id
            )));
        }

        Ok(self.next_line_id.max(derived))
    }
}
