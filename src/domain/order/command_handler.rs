use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use uuid::Uuid;

use crate::config::OrderServiceConfig;
use crate::event_sourcing::core::{Aggregate, EventEnvelope};
use crate::event_sourcing::store::{EventStore, StoreError};
use crate::metrics::OrderMetrics;

use super::aggregate::Order;
use super::commands::OrderCommand;
use super::errors::OrderError;
use super::events::OrderEvent;
use super::sequencer::{AtomicOrderIdSequencer, OrderIdSequencer};
use super::snapshot::OrderSnapshot;
use super::value_objects::{OrderId, OrderItem, TableRef};

pub type OrderEventStore = EventStore<OrderId, OrderEvent>;

// ============================================================================
// Order Command Handler
// ============================================================================
//
// Orchestrates: Command → Aggregate → Events → Event Store
//
// Writes to one order are serialized by the store's version check: a command
// decided against a stale version is rejected, never merged.
//
// ============================================================================

pub struct OrderCommandHandler {
    event_store: Arc<OrderEventStore>,
    sequencer: Arc<dyn OrderIdSequencer>,
    metrics: Arc<OrderMetrics>,
    archive_terminal_orders: bool,
}

impl OrderCommandHandler {
    pub fn new(
        event_store: Arc<OrderEventStore>,
        sequencer: Arc<dyn OrderIdSequencer>,
        metrics: Arc<OrderMetrics>,
        archive_terminal_orders: bool,
    ) -> Self {
        Self {
            event_store,
            sequencer,
            metrics,
            archive_terminal_orders,
        }
    }

    pub fn from_config(config: &OrderServiceConfig) -> Result<Self> {
        Ok(Self::new(
            Arc::new(OrderEventStore::new("Order")),
            Arc::new(AtomicOrderIdSequencer::starting_at(config.first_order_id)),
            Arc::new(OrderMetrics::new()?),
            config.archive_terminal_orders,
        ))
    }

    pub fn event_store(&self) -> &Arc<OrderEventStore> {
        &self.event_store
    }

    pub fn metrics(&self) -> &Arc<OrderMetrics> {
        &self.metrics
    }

    /// Open a new order for `table` and persist its first event.
    pub async fn open_order(
        &self,
        table: TableRef,
        items: Vec<OrderItem>,
        correlation_id: Uuid,
    ) -> Result<OrderId> {
        const COMMAND: &str = "OpenOrder";
        let started = Instant::now();

        let opened = Order::opening_event(self.sequencer.as_ref(), table.clone(), items)
            .map_err(|e| self.rejected(COMMAND, None, started, e))?;
        let order = Order::apply_first_event(&opened)?;
        let order_id = order.order_id();

        let envelope = EventEnvelope::new(order_id, 1, opened, correlation_id)
            .with_metadata("command", COMMAND)
            .with_metadata("table", table.as_str());

        self.event_store.append_events(order_id, 0, vec![envelope], true).await?;

        self.metrics.record_opened();
        self.metrics.record_command(COMMAND, started.elapsed().as_secs_f64(), None);

        tracing::info!(
            order_id = %order_id,
            table = %table,
            items = order.items().len(),
            correlation_id = %correlation_id,
            "Order opened"
        );

        Ok(order_id)
    }

    /// Handle a command and persist resulting events. Returns the new version.
    ///
    /// Archived orders are still run through the aggregate so callers see the
    /// same business rule error a live terminal order would give.
    pub async fn handle(
        &self,
        order_id: OrderId,
        command: OrderCommand,
        correlation_id: Uuid,
    ) -> Result<i64> {
        let started = Instant::now();
        let command_id = Uuid::new_v4();

        let (order, archived) = match self.event_store.load_aggregate::<Order>(order_id).await {
            Ok(order) => (order, false),
            Err(err) if is_archived(&err) => {
                let order = self
                    .event_store
                    .load_archived::<Order>(order_id)
                    .await
                    .map_err(|e| self.store_failed(command.name(), order_id, started, e))?;
                (order, true)
            }
            Err(err) => return Err(self.store_failed(command.name(), order_id, started, err)),
        };
        let expected_version = order.version();

        let mut next = order.clone();
        let events = next
            .execute(&command)
            .map_err(|e| self.rejected(command.name(), Some(&order), started, e))?;

        if archived {
            let err = StoreError::Archived {
                aggregate_type: self.event_store.aggregate_type_name().to_string(),
                aggregate_id: order_id.to_string(),
            };
            return Err(self.store_failed(command.name(), order_id, started, err.into()));
        }

        let envelopes = events
            .iter()
            .cloned()
            .zip(expected_version + 1..)
            .map(|(event, seq)| {
                EventEnvelope::new(order_id, seq, event, correlation_id)
                    .with_causation(command_id)
                    .with_metadata("command", command.name())
            })
            .collect();

        let new_version = self
            .event_store
            .append_events(order_id, expected_version, envelopes, true)
            .await
            .map_err(|e| self.store_failed(command.name(), order_id, started, e))?;

        for status in events.iter().filter_map(OrderEvent::resulting_status) {
            self.metrics.record_transition(status.as_str());
        }
        self.metrics.record_command(command.name(), started.elapsed().as_secs_f64(), None);

        tracing::info!(
            order_id = %order_id,
            command = command.name(),
            command_id = %command_id,
            from = %order.status(),
            status = %next.status(),
            version = new_version,
            correlation_id = %correlation_id,
            "Order command handled"
        );

        if self.archive_terminal_orders && next.is_terminal() {
            // events are committed; a failed move only delays eviction
            match self.event_store.archive(order_id).await {
                Ok(_) => {
                    self.metrics.record_archived();
                    tracing::info!(order_id = %order_id, status = %next.status(), "Order archived");
                }
                Err(err) => {
                    tracing::warn!(order_id = %order_id, error = %err, "Failed to archive order");
                }
            }
        }

        Ok(new_version)
    }

    /// Current state of an order, whether live or archived.
    pub async fn order(&self, order_id: OrderId) -> Result<Order> {
        match self.event_store.load_aggregate::<Order>(order_id).await {
            Err(err) if is_archived(&err) => {
                self.event_store.load_archived::<Order>(order_id).await
            }
            result => result,
        }
    }

    pub async fn snapshot(&self, order_id: OrderId) -> Result<OrderSnapshot> {
        Ok(self.order(order_id).await?.snapshot())
    }

    /// Ids of orders still in the live set, ascending.
    pub async fn live_orders(&self) -> Vec<OrderId> {
        let mut ids = self.event_store.live_ids().await;
        ids.sort();
        ids
    }

    fn rejected(
        &self,
        command: &'static str,
        order: Option<&Order>,
        started: Instant,
        err: OrderError,
    ) -> anyhow::Error {
        let kind = err.kind();
        self.metrics
            .record_command(command, started.elapsed().as_secs_f64(), Some(kind.as_str()));

        tracing::warn!(
            order_id = order.map(|o| o.order_id().value()),
            status = order.map(|o| o.status().as_str()),
            command,
            kind = %kind,
            error = %err,
            "Order command rejected"
        );

        err.into()
    }

    fn store_failed(
        &self,
        command: &'static str,
        order_id: OrderId,
        started: Instant,
        err: anyhow::Error,
    ) -> anyhow::Error {
        let kind = match err.downcast_ref::<StoreError>() {
            Some(StoreError::ConcurrencyConflict { .. }) => "conflict",
            Some(StoreError::NotFound { .. }) => "not_found",
            Some(StoreError::Archived { .. }) => "archived",
            None => "store",
        };
        self.metrics
            .record_command(command, started.elapsed().as_secs_f64(), Some(kind));

        tracing::warn!(
            order_id = order_id.value(),
            command,
            kind,
            error = %err,
            "Order command failed in store"
        );

        err
    }
}

fn is_archived(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<StoreError>(), Some(StoreError::Archived { .. }))
}

// ============================================================================
// Unit Tests
// ============================================================================
