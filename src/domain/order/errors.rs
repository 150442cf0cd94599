use std::fmt;

use super::value_objects::{LineId, OrderStatus};

// ============================================================================
// Order Business Rule Errors
// ============================================================================

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidState,
    NotFound,
    Validation,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Validation => "validation",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("Cannot {operation} order in status {status}")]
    InvalidState {
        operation: &'static str,
        status: OrderStatus,
    },

    #[error("Illegal status transition: {from} -> {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order item not found: {0}")]
    ItemNotFound(LineId),

    #[error("Table reference cannot be empty")]
    InvalidTable,

    #[error("Menu item reference cannot be empty")]
    InvalidMenuItem,

    #[error("Invalid item quantity: {0}")]
    InvalidQuantity(u32),

    #[error("Order items cannot be empty")]
    EmptyItems,

    #[error("Inconsistent order snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Aggregate not initialized")]
    NotInitialized,
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::InvalidState { .. }
            | OrderError::IllegalTransition { .. }
            | OrderError::NotInitialized => ErrorKind::InvalidState,
            OrderError::ItemNotFound(_) => ErrorKind::NotFound,
            OrderError::InvalidTable
            | OrderError::InvalidMenuItem
            | OrderError::InvalidQuantity(_)
            | OrderError::EmptyItems
            | OrderError::InvalidSnapshot(_) => ErrorKind::Validation,
        }
    }
}
