use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use anyhow::Result;

// ============================================================================
// Event Envelope - Event Metadata
// ============================================================================
//
// Wraps domain events with metadata. Generic over the aggregate id type and
// the event payload.
//
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EventEnvelope<I, E> {
    // Event Identity
    pub event_id: Uuid,
    pub aggregate_id: I,
    pub sequence_number: i64,

    // Event Type Information
    pub event_type: String,
    pub event_version: i32,

    // Event Payload
    pub event_data: E,

    // Causation & Correlation
    pub causation_id: Option<Uuid>,
    pub correlation_id: Uuid,

    pub timestamp: DateTime<Utc>,

    pub metadata: HashMap<String, String>,
}

impl<I, E: DomainEvent> EventEnvelope<I, E> {
    pub fn new(aggregate_id: I, sequence_number: i64, event_data: E, correlation_id: Uuid) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            aggregate_id,
            sequence_number,
            event_type: event_data.event_type().to_string(),
            event_version: event_data.event_version(),
            event_data,
            causation_id: None,
            correlation_id,
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_causation(mut self, causation_id: Uuid) -> Self {
        self.causation_id = Some(causation_id);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Domain Event Trait
// ============================================================================

pub trait DomainEvent: Serialize + DeserializeOwned + Clone + Send + Sync {
    fn event_type(&self) -> &'static str;
    fn event_version(&self) -> i32 { 1 }
}

// ============================================================================
// Event Serialization Helpers
// ============================================================================

pub fn serialize_event<E: Serialize>(event: &E) -> Result<String> {
    Ok(serde_json::to_string(event)?)
}

// ============================================================================
// Tests
// ============================================================================
