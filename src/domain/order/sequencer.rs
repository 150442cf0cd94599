use std::sync::atomic::{AtomicU64, Ordering};

use super::value_objects::OrderId;

// ============================================================================
// Order Id Sequencer
// ============================================================================

/// Source of order identifiers. Must never hand out the same id twice per process.
pub trait OrderIdSequencer: Send + Sync {
    fn next_id(&self) -> OrderId;
}

#[derive(Debug)]
pub struct AtomicOrderIdSequencer {
    next: AtomicU64,
}

impl AtomicOrderIdSequencer {
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl Default for AtomicOrderIdSequencer {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl OrderIdSequencer for AtomicOrderIdSequencer {
    fn next_id(&self) -> OrderId {
        OrderId(self.next.fetch_add(1, Ordering::SeqCst))
    }
}
