use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

use anyhow::{Result, bail};
use tokio::sync::{RwLock, broadcast};

use crate::event_sourcing::core::{Aggregate, DomainEvent, EventEnvelope};

// ============================================================================
// Generic Event Store - In-memory repository for event streams
// ============================================================================
//
// Responsibilities:
// 1. Append events to per-aggregate streams (append-only)
// 2. Load event history for aggregates
// 3. Optimistic concurrency control on the stream version
// 4. Fan appended events out to subscribers (outbox)
// 5. Move finished streams out of the live set (archive)
//
// ============================================================================

const OUTBOX_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Concurrency conflict on {aggregate_type} {aggregate_id}: expected version {expected}, but current is {current}")]
    ConcurrencyConflict {
        aggregate_type: String,
        aggregate_id: String,
        expected: i64,
        current: i64,
    },

    #[error("{aggregate_type} {aggregate_id} not found")]
    NotFound {
        aggregate_type: String,
        aggregate_id: String,
    },

    #[error("{aggregate_type} {aggregate_id} is archived")]
    Archived {
        aggregate_type: String,
        aggregate_id: String,
    },
}

struct Streams<I, E> {
    live: HashMap<I, Vec<EventEnvelope<I, E>>>,
    archived: HashMap<I, Vec<EventEnvelope<I, E>>>,
}

pub struct EventStore<I, E> {
    aggregate_type_name: String,  // e.g. "Order"
    streams: RwLock<Streams<I, E>>,
    outbox: broadcast::Sender<EventEnvelope<I, E>>,
}

impl<I, E> EventStore<I, E>
where
    I: Copy + Eq + Hash + Display + Send + Sync,
    E: DomainEvent,
{
    pub fn new(aggregate_type_name: &str) -> Self {
        let (outbox, _) = broadcast::channel(OUTBOX_CAPACITY);
        Self {
            aggregate_type_name: aggregate_type_name.to_string(),
            streams: RwLock::new(Streams {
                live: HashMap::new(),
                archived: HashMap::new(),
            }),
            outbox,
        }
    }

    pub fn aggregate_type_name(&self) -> &str {
        &self.aggregate_type_name
    }

    /// Receive every envelope appended after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope<I, E>> {
        self.outbox.subscribe()
    }

    /// Append events to the aggregate's stream.
    /// Returns the new version number after appending.
    pub async fn append_events(
        &self,
        aggregate_id: I,
        expected_version: i64,
        events: Vec<EventEnvelope<I, E>>,
        publish_to_outbox: bool,
    ) -> Result<i64> {
        if events.is_empty() {
            bail!("Cannot append empty event list");
        }

        let mut streams = self.streams.write().await;

        if streams.archived.contains_key(&aggregate_id) {
            return Err(self.archived(aggregate_id).into());
        }

        let current_version = streams.live.get(&aggregate_id).map_or(0, |s| s.len() as i64);
        if current_version != expected_version {
            return Err(StoreError::ConcurrencyConflict {
                aggregate_type: self.aggregate_type_name.clone(),
                aggregate_id: aggregate_id.to_string(),
                expected: expected_version,
                current: current_version,
            }
            .into());
        }

        let stream = streams.live.entry(aggregate_id).or_default();
        let mut new_version = expected_version;
        for mut envelope in events {
            new_version += 1;
            envelope.sequence_number = new_version;
            envelope.aggregate_id = aggregate_id;

            if publish_to_outbox {
                // no subscribers is fine
                let _ = self.outbox.send(envelope.clone());
            }
            stream.push(envelope);
        }

        tracing::debug!(
            aggregate_type = %self.aggregate_type_name,
            aggregate_id = %aggregate_id,
            version = new_version,
            "Appended events"
        );

        Ok(new_version)
    }

    pub async fn load_events(&self, aggregate_id: I) -> Result<Vec<EventEnvelope<I, E>>> {
        let streams = self.streams.read().await;
        Ok(streams.live.get(&aggregate_id).cloned().unwrap_or_default())
    }

    /// Get current version of aggregate; 0 when no stream exists.
    pub async fn current_version(&self, aggregate_id: I) -> i64 {
        let streams = self.streams.read().await;
        streams.live.get(&aggregate_id).map_or(0, |s| s.len() as i64)
    }

    /// Load aggregate from events
    pub async fn load_aggregate<A>(&self, aggregate_id: I) -> Result<A>
    where
        A: Aggregate<Id = I, Event = E>,
        A::Error: std::error::Error + Send + Sync + 'static,
    {
        let streams = self.streams.read().await;

        match streams.live.get(&aggregate_id) {
            Some(events) if !events.is_empty() => A::load_from_events(events),
            _ if streams.archived.contains_key(&aggregate_id) => {
                Err(self.archived(aggregate_id).into())
            }
            _ => Err(self.not_found(aggregate_id).into()),
        }
    }

    /// Ids of every live (non-archived) stream.
    pub async fn live_ids(&self) -> Vec<I> {
        let streams = self.streams.read().await;
        streams.live.keys().copied().collect()
    }

    /// Move a stream out of the live set. Returns the number of events moved.
    pub async fn archive(&self, aggregate_id: I) -> Result<usize> {
        let mut streams = self.streams.write().await;

        let Some(events) = streams.live.remove(&aggregate_id) else {
            return Err(self.not_found(aggregate_id).into());
        };
        let count = events.len();
        streams.archived.insert(aggregate_id, events);

        tracing::debug!(
            aggregate_type = %self.aggregate_type_name,
            aggregate_id = %aggregate_id,
            events = count,
            "Archived stream"
        );

        Ok(count)
    }

    pub async fn load_archived<A>(&self, aggregate_id: I) -> Result<A>
    where
        A: Aggregate<Id = I, Event = E>,
        A::Error: std::error::Error + Send + Sync + 'static,
    {
        let streams = self.streams.read().await;

        match streams.archived.get(&aggregate_id) {
            Some(events) => A::load_from_events(events),
            None => Err(self.not_found(aggregate_id).into()),
        }
    }

    fn not_found(&self, aggregate_id: I) -> StoreError {
        StoreError::NotFound {
            aggregate_type: self.aggregate_type_name.clone(),
            aggregate_id: aggregate_id.to_string(),
        }
    }

    fn archived(&self, aggregate_id: I) -> StoreError {
        StoreError::Archived {
            aggregate_type: self.aggregate_type_name.clone(),
            aggregate_id: aggregate_id.to_string(),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
