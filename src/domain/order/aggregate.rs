use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::event_sourcing::core::Aggregate;
use super::value_objects::{LineId, OrderId, OrderItem, OrderLine, OrderStatus, TableRef};
use super::events::*;
use super::commands::OrderCommand;
use super::errors::OrderError;
use super::sequencer::OrderIdSequencer;
use super::snapshot::OrderSnapshot;

// ============================================================================
// Order Aggregate - Domain Logic
// ============================================================================

/// One restaurant order and its lifecycle.
///
/// All fields are private: state only moves through the operations below,
/// each of which is a validated command followed by the event it produces.
/// Serialization goes through [`OrderSnapshot`], so deserializing re-checks
/// every invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OrderSnapshot", into = "OrderSnapshot")]
pub struct Order {
    order_id: OrderId,
    table: TableRef,
    status: OrderStatus,
    lines: Vec<OrderLine>,
    create_time: DateTime<Utc>,
    next_line: u32,
    version: i64,
}

pub(crate) fn validate_item(item: &OrderItem) -> Result<(), OrderError> {
    if item.menu_item.as_str().trim().is_empty() {
        return Err(OrderError::InvalidMenuItem);
    }
    if item.quantity == 0 {
        return Err(OrderError::InvalidQuantity(item.quantity));
    }
    Ok(())
}

impl Order {
    /// Open a new order for `table`, drawing its id from `sequencer`.
    ///
    /// Nothing is drawn from the sequencer when validation fails.
    pub fn create(
        sequencer: &dyn OrderIdSequencer,
        table: TableRef,
        initial_items: Vec<OrderItem>,
    ) -> Result<Self, OrderError> {
        let opened = Self::opening_event(sequencer, table, initial_items)?;
        Self::apply_first_event(&opened)
    }

    /// Validate an opening request and build the first event of a new stream.
    pub fn opening_event(
        sequencer: &dyn OrderIdSequencer,
        table: TableRef,
        initial_items: Vec<OrderItem>,
    ) -> Result<OrderEvent, OrderError> {
        if !table.is_valid() {
            return Err(OrderError::InvalidTable);
        }
        for item in &initial_items {
            validate_item(item)?;
        }

        let lines = initial_items
            .into_iter()
            .zip(1..)
            .map(|(item, n)| OrderLine { line_id: LineId(n), item })
            .collect();

        Ok(OrderEvent::Opened(OrderOpened {
            order_id: sequencer.next_id(),
            table,
            lines,
            created_at: Utc::now(),
        }))
    }

    /// Rebuild an order from persisted state.
    pub fn restore(snapshot: OrderSnapshot) -> Result<Self, OrderError> {
        let next_line = snapshot.validate()?;
        Ok(Self {
            order_id: snapshot.order_id,
            table: snapshot.table,
            status: snapshot.status,
            lines: snapshot.items,
            create_time: snapshot.create_time,
            next_line,
            version: snapshot.version,
        })
    }

    pub fn snapshot(&self) -> OrderSnapshot {
        OrderSnapshot {
            order_id: self.order_id,
            table: self.table.clone(),
            status: self.status,
            items: self.lines.clone(),
            create_time: self.create_time,
            next_line_id: self.next_line,
            version: self.version,
        }
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    pub fn add_item(&mut self, item: OrderItem) -> Result<LineId, OrderError> {
        let line_id = LineId(self.next_line);
        self.execute(&OrderCommand::AddItem { item })?;
        Ok(line_id)
    }

    pub fn remove_item(&mut self, line_id: LineId) -> Result<(), OrderError> {
        self.execute(&OrderCommand::RemoveItem { line_id }).map(drop)
    }

    pub fn confirm(&mut self) -> Result<(), OrderError> {
        self.execute(&OrderCommand::ConfirmOrder).map(drop)
    }

    /// Move one step along CONFIRMED -> PREPARING -> SERVED -> PAID.
    pub fn advance(&mut self) -> Result<OrderStatus, OrderError> {
        self.execute(&OrderCommand::AdvanceOrder)?;
        Ok(self.status)
    }

    pub fn cancel(&mut self) -> Result<(), OrderError> {
        self.execute(&OrderCommand::CancelOrder).map(drop)
    }

    /// Handle `command` and apply what it produces. On error `self` is untouched.
    pub fn execute(&mut self, command: &OrderCommand) -> Result<Vec<OrderEvent>, OrderError> {
        let events = self.handle_command(command)?;

        let mut next = self.clone();
        for event in &events {
            next.apply_event(event)?;
        }
        *self = next;

        Ok(events)
    }

    // ------------------------------------------------------------------------
    // Read accessors
    // ------------------------------------------------------------------------

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn items(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn create_time(&self) -> DateTime<Utc> {
        self.create_time
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    // ------------------------------------------------------------------------
    // Rules
    // ------------------------------------------------------------------------

    fn require_open(&self, operation: &'static str) -> Result<(), OrderError> {
        if self.status.is_open() {
            Ok(())
        } else {
            Err(OrderError::InvalidState { operation, status: self.status })
        }
    }

    fn check_transition(&self, from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
        if from != self.status || !from.can_transition_to(to) {
            return Err(OrderError::IllegalTransition { from: self.status, to });
        }
        Ok(())
    }

    fn line_position(&self, line_id: LineId) -> Result<usize, OrderError> {
        self.lines
            .iter()
            .position(|l| l.line_id == line_id)
            .ok_or(OrderError::ItemNotFound(line_id))
    }
}

// ============================================================================
// Aggregate Trait Implementation
// ============================================================================

impl Aggregate for Order {
    type Id = OrderId;
    type Event = OrderEvent;
    type Command = OrderCommand;
    type Error = OrderError;

    fn apply_first_event(event: &Self::Event) -> Result<Self, Self::Error> {
        match event {
            OrderEvent::Opened(e) => Self::restore(OrderSnapshot {
                order_id: e.order_id,
                table: e.table.clone(),
                status: OrderStatus::Open,
                items: e.lines.clone(),
                create_time: e.created_at,
                next_line_id: 0,
                version: 1,
            }),
            _ => Err(OrderError::NotInitialized),
        }
    }

    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            OrderEvent::Opened(_) => {
                return Err(OrderError::InvalidState { operation: "open", status: self.status });
            }
            OrderEvent::ItemAdded(e) => {
                self.require_open("add item to")?;
                validate_item(&e.line.item)?;
                if e.line.line_id.0 < self.next_line {
                    return Err(OrderError::InvalidSnapshot(format!(
                        "line id {} reused",
                        e.line.line_id
                    )));
                }
                let next_line = e.line.line_id.0.checked_add(1).ok_or_else(|| {
                    OrderError::InvalidSnapshot(format!("line id {} out of range", e.line.line_id))
                })?;
                self.lines.push(e.line.clone());
                self.next_line = next_line;
            }
            OrderEvent::ItemRemoved(e) => {
                self.require_open("remove item from")?;
                let pos = self.line_position(e.line_id)?;
                self.lines.remove(pos);
            }
            OrderEvent::Confirmed(_) => {
                self.check_transition(self.status, OrderStatus::Confirmed)?;
                if self.lines.is_empty() {
                    return Err(OrderError::EmptyItems);
                }
                self.status = OrderStatus::Confirmed;
            }
            OrderEvent::Advanced(e) => {
                if self.status.advance_target() != Some(e.to) {
                    return Err(OrderError::IllegalTransition { from: self.status, to: e.to });
                }
                self.check_transition(e.from, e.to)?;
                self.status = e.to;
            }
            OrderEvent::Cancelled(e) => {
                self.check_transition(e.from, OrderStatus::Cancelled)?;
                if self.lines.is_empty() {
                    return Err(OrderError::EmptyItems);
                }
                self.status = OrderStatus::Cancelled;
            }
        }

        self.version += 1;
        Ok(())
    }

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let now = Utc::now();

        match command {
            OrderCommand::AddItem { item } => {
                self.require_open(command.operation())?;
                validate_item(item)?;

                Ok(vec![OrderEvent::ItemAdded(OrderItemAdded {
                    line: OrderLine {
                        line_id: LineId(self.next_line),
                        item: item.clone(),
                    },
                })])
            }

            OrderCommand::RemoveItem { line_id } => {
                self.require_open(command.operation())?;
                self.line_position(*line_id)?;

                Ok(vec![OrderEvent::ItemRemoved(OrderItemRemoved { line_id: *line_id })])
            }

            OrderCommand::ConfirmOrder => {
                self.require_open(command.operation())?;
                if self.lines.is_empty() {
                    return Err(OrderError::EmptyItems);
                }

                Ok(vec![OrderEvent::Confirmed(OrderConfirmed { confirmed_at: now })])
            }

            OrderCommand::AdvanceOrder => {
                let to = self.status.advance_target().ok_or(OrderError::InvalidState {
                    operation: command.operation(),
                    status: self.status,
                })?;

                Ok(vec![OrderEvent::Advanced(OrderAdvanced {
                    from: self.status,
                    to,
                    advanced_at: now,
                })])
            }

            OrderCommand::CancelOrder => {
                if !self.status.can_cancel() {
                    return Err(OrderError::InvalidState {
                        operation: command.operation(),
                        status: self.status,
                    });
                }
                // an order only leaves OPEN with items on it
                if self.lines.is_empty() {
                    return Err(OrderError::EmptyItems);
                }

                Ok(vec![OrderEvent::Cancelled(OrderCancelled {
                    from: self.status,
                    cancelled_at: now,
                })])
            }
        }
    }

    fn aggregate_id(&self) -> OrderId {
        self.order_id
    }

    fn version(&self) -> i64 {
        self.version
    }
}

impl TryFrom<OrderSnapshot> for Order {
    type Error = OrderError;

    fn try_from(snapshot: OrderSnapshot) -> Result<Self, Self::Error> {
        Self::restore(snapshot)
    }
}

impl From<Order> for OrderSnapshot {
    fn from(order: Order) -> Self {
        order.snapshot()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{AtomicOrderIdSequencer, ErrorKind, TRANSITIONS};
    use crate::event_sourcing::core::EventEnvelope;
    use uuid::Uuid;

    fn new_order(table: &str) -> Order {
        Order::create(&AtomicOrderIdSequencer::default(), TableRef::new(table), vec![]).unwrap()
    }

    fn pizza() -> OrderItem {
        OrderItem::new("pizza", 1)
    }

    #[test]
    fn test_create_order() {
        let seq = AtomicOrderIdSequencer::starting_at(42);
        let order = Order::create(&seq, TableRef::new("T1"), vec![]).unwrap();

        assert_eq!(order.order_id(), OrderId(42));
        assert_eq!(order.table().as_str(), "T1");
        assert_eq!(order.status(), OrderStatus::Open);
        assert!(order.items().is_empty());
        assert_eq!(order.version(), 1);
    }

    #[test]
    fn test_create_with_initial_items_keeps_order() {
        let items = vec![OrderItem::new("soup", 1), OrderItem::new("bread", 2)];
        let order = Order::create(&AtomicOrderIdSequencer::default(), TableRef::new("T9"), items)
            .unwrap();

        let names: Vec<_> = order.items().iter().map(|l| l.item.menu_item.as_str()).collect();
        assert_eq!(names, ["soup", "bread"]);
        assert_eq!(order.items()[0].line_id, LineId(1));
        assert_eq!(order.items()[1].line_id, LineId(2));
    }

    #[test]
    fn test_create_rejects_blank_table_without_consuming_id() {
        let seq = AtomicOrderIdSequencer::starting_at(1);

        let result = Order::create(&seq, TableRef::new(" "), vec![]);
        assert!(matches!(result.unwrap_err(), OrderError::InvalidTable));

        let order = Order::create(&seq, TableRef::new("T1"), vec![]).unwrap();
        assert_eq!(order.order_id(), OrderId(1));
    }

    #[test]
    fn test_create_rejects_zero_quantity() {
        let result = Order::create(
            &AtomicOrderIdSequencer::default(),
            TableRef::new("T1"),
            vec![OrderItem::new("pizza", 0)],
        );
        assert!(matches!(result.unwrap_err(), OrderError::InvalidQuantity(0)));
    }

    #[test]
    fn test_happy_path_to_paid() {
        let mut order = new_order("T1");
        assert_eq!(order.status(), OrderStatus::Open);

        order.add_item(pizza()).unwrap();
        assert_eq!(order.items().len(), 1);
        assert_eq!(order.items()[0].item, pizza());

        order.confirm().unwrap();
        assert_eq!(order.status(), OrderStatus::Confirmed);
        assert_eq!(order.advance().unwrap(), OrderStatus::Preparing);
        assert_eq!(order.advance().unwrap(), OrderStatus::Served);
        assert_eq!(order.advance().unwrap(), OrderStatus::Paid);

        let err = order.advance().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(order.status(), OrderStatus::Paid);
    }

    #[test]
    fn test_confirm_empty_order_fails() {
        let mut order = new_order("T2");
        let before = order.clone();

        let err = order.confirm().unwrap_err();
        assert!(matches!(err, OrderError::EmptyItems));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(order.status(), OrderStatus::Open);
        assert_eq!(order, before);
    }

    #[test]
    fn test_confirm_after_removing_last_item_fails() {
        let mut order = new_order("T2");
        let line = order.add_item(pizza()).unwrap();
        order.remove_item(line).unwrap();

        assert!(matches!(order.confirm().unwrap_err(), OrderError::EmptyItems));
    }

    #[test]
    fn test_cancel_then_add_fails() {
        let mut order = new_order("T3");
        order.add_item(OrderItem::new("A", 1)).unwrap();
        order.cancel().unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);

        let err = order.add_item(OrderItem::new("B", 1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(order.items().len(), 1);
    }

    #[test]
    fn test_cannot_cancel_served_order() {
        let mut order = new_order("T4");
        order.add_item(pizza()).unwrap();
        order.confirm().unwrap();
        order.advance().unwrap();
        order.advance().unwrap();
        assert_eq!(order.status(), OrderStatus::Served);

        let err = order.cancel().unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidState { status: OrderStatus::Served, .. }
        ));
    }

    #[test]
    fn test_cancel_from_preparing() {
        let mut order = new_order("T4");
        order.add_item(pizza()).unwrap();
        order.confirm().unwrap();
        order.advance().unwrap();

        order.cancel().unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);
    }

    #[test]
    fn test_advance_from_open_requires_confirm() {
        let mut order = new_order("T5");
        order.add_item(pizza()).unwrap();

        let err = order.advance().unwrap_err();
        assert!(matches!(err, OrderError::InvalidState { status: OrderStatus::Open, .. }));
    }

    #[test]
    fn test_remove_item() {
        let mut order = new_order("T6");
        let a = order.add_item(OrderItem::new("A", 1)).unwrap();
        let b = order.add_item(OrderItem::new("B", 2)).unwrap();
        let c = order.add_item(OrderItem::new("C", 3)).unwrap();

        order.remove_item(b).unwrap();

        let ids: Vec<_> = order.items().iter().map(|l| l.line_id).collect();
        assert_eq!(ids, [a, c]);
    }

    #[test]
    fn test_line_ids_not_reused_after_removal() {
        let mut order = new_order("T6");
        let a = order.add_item(OrderItem::new("A", 1)).unwrap();
        order.remove_item(a).unwrap();
        let b = order.add_item(OrderItem::new("A", 1)).unwrap();

        assert_ne!(a, b);
        assert!(matches!(order.remove_item(a).unwrap_err(), OrderError::ItemNotFound(id) if id == a));
    }

    #[test]
    fn test_remove_missing_item_is_not_found() {
        let mut order = new_order("T7");
        let err = order.remove_item(LineId(99)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_remove_after_confirm_is_invalid_state() {
        let mut order = new_order("T7");
        let line = order.add_item(pizza()).unwrap();
        order.confirm().unwrap();

        // status is checked before presence
        assert_eq!(order.remove_item(line).unwrap_err().kind(), ErrorKind::InvalidState);
        assert_eq!(order.remove_item(LineId(99)).unwrap_err().kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_terminal_orders_reject_everything() {
        let mut paid = new_order("T8");
        let line = paid.add_item(pizza()).unwrap();
        paid.confirm().unwrap();
        for _ in 0..3 {
            paid.advance().unwrap();
        }

        let mut cancelled = new_order("T8");
        cancelled.add_item(pizza()).unwrap();
        cancelled.cancel().unwrap();

        for order in [&mut paid, &mut cancelled] {
            let before = order.clone();
            let results = [
                order.add_item(pizza()).map(drop),
                order.remove_item(line),
                order.confirm(),
                order.advance().map(drop),
                order.cancel(),
            ];
            for result in results {
                assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidState);
            }
            assert_eq!(*order, before);
        }
    }

    #[test]
    fn test_cancel_empty_order_fails() {
        let mut order = new_order("T8");
        let before = order.clone();

        let err = order.cancel().unwrap_err();
        assert!(matches!(err, OrderError::EmptyItems));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(order, before);
    }

    #[test]
    fn test_cancelled_order_round_trip() {
        let mut order = new_order("T3");
        order.add_item(OrderItem::new("A", 1)).unwrap();
        order.cancel().unwrap();

        let json = serde_json::to_string(&order).unwrap();
        let restored: Order = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.status(), OrderStatus::Cancelled);
        assert_eq!(restored, order);
    }

    #[test]
    fn test_replay_rejects_cancel_of_empty_order() {
        let mut order = new_order("T3");
        let event = OrderEvent::Cancelled(OrderCancelled {
            from: OrderStatus::Open,
            cancelled_at: Utc::now(),
        });

        assert!(matches!(order.apply_event(&event), Err(OrderError::EmptyItems)));
        assert_eq!(order.status(), OrderStatus::Open);
    }

    #[test]
    fn test_deserialize_rejects_max_line_id() {
        let mut order = new_order("T1");
        order.add_item(pizza()).unwrap();
        let mut snapshot = order.snapshot();
        snapshot.items[0].line_id = LineId(u32::MAX);
        snapshot.next_line_id = 0;

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(serde_json::from_str::<Order>(&json).is_err());
        assert!(matches!(Order::restore(snapshot), Err(OrderError::InvalidSnapshot(_))));
    }

    #[test]
    fn test_restore_rejects_exhausted_line_numbering() {
        let mut snapshot = new_order("T1").snapshot();
        snapshot.next_line_id = u32::MAX;

        assert!(matches!(Order::restore(snapshot), Err(OrderError::InvalidSnapshot(_))));
    }

    #[test]
    fn test_add_item_at_last_line_id_is_an_error() {
        let mut order = new_order("T1");
        order.add_item(pizza()).unwrap();
        let mut snapshot = order.snapshot();
        snapshot.items[0].line_id = LineId(u32::MAX - 1);
        snapshot.next_line_id = 0;

        let mut restored = Order::restore(snapshot).unwrap();
        let before = restored.clone();

        let err = restored.add_item(pizza()).unwrap_err();
        assert!(matches!(err, OrderError::InvalidSnapshot(_)));
        assert_eq!(restored, before);
    }

    #[test]
    fn test_replay_rejects_max_line_id() {
        let mut order = new_order("T1");
        let event = OrderEvent::ItemAdded(OrderItemAdded {
            line: OrderLine { line_id: LineId(u32::MAX), item: pizza() },
        });

        assert!(matches!(order.apply_event(&event), Err(OrderError::InvalidSnapshot(_))));
        assert!(order.items().is_empty());
    }

    #[test]
    fn test_create_time_never_changes() {
        let mut order = new_order("T1");
        let created = order.create_time();

        order.add_item(pizza()).unwrap();
        order.confirm().unwrap();
        while order.advance().is_ok() {}
        let _ = order.cancel();

        assert_eq!(order.create_time(), created);
    }

    #[test]
    fn test_all_command_sequences_follow_transition_table() {
        #[derive(Clone, Copy)]
        enum Op { Add, RemoveFirst, RemoveMissing, Confirm, Advance, Cancel }
        const OPS: [Op; 6] = [Op::Add, Op::RemoveFirst, Op::RemoveMissing, Op::Confirm, Op::Advance, Op::Cancel];

        fn walk(order: &Order, depth: usize) {
            if depth == 0 {
                return;
            }
            for op in OPS {
                let mut next = order.clone();
                let result = match op {
                    Op::Add => next.add_item(OrderItem::new("x", 1)).map(drop),
                    Op::RemoveFirst => match next.items().first().map(|l| l.line_id) {
                        Some(line_id) => next.remove_item(line_id),
                        None => continue,
                    },
                    Op::RemoveMissing => next.remove_item(LineId(u32::MAX)),
                    Op::Confirm => next.confirm(),
                    Op::Advance => next.advance().map(drop),
                    Op::Cancel => next.cancel(),
                };

                match result {
                    Ok(()) => {
                        let (from, to) = (order.status(), next.status());
                        assert!(from == to || TRANSITIONS.contains(&(from, to)), "{from} -> {to}");
                        assert_eq!(next.version(), order.version() + 1);
                    }
                    Err(_) => assert_eq!(&next, order),
                }
                if !next.status().is_open() {
                    assert!(!next.items().is_empty());
                }
                assert_eq!(next.create_time(), order.create_time());

                walk(&next, depth - 1);
            }
        }

        walk(&new_order("T1"), 5);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut order = new_order("T1");
        let a = order.add_item(OrderItem::new("A", 2)).unwrap();
        order.add_item(OrderItem::new("B", 1)).unwrap();
        order.remove_item(a).unwrap();
        order.confirm().unwrap();
        order.advance().unwrap();

        let json = serde_json::to_string(&order).unwrap();
        let restored: Order = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.order_id(), order.order_id());
        assert_eq!(restored.table(), order.table());
        assert_eq!(restored.status(), order.status());
        assert_eq!(restored.items(), order.items());
        assert_eq!(restored.create_time(), order.create_time());
        assert_eq!(restored, order);
    }

    #[test]
    fn test_restored_order_keeps_line_numbering() {
        let mut order = new_order("T1");
        let a = order.add_item(OrderItem::new("A", 1)).unwrap();
        let b = order.add_item(OrderItem::new("B", 1)).unwrap();
        order.remove_item(b).unwrap();

        let mut restored = Order::restore(order.snapshot()).unwrap();
        let c = restored.add_item(OrderItem::new("C", 1)).unwrap();

        assert!(c > b);
        assert_ne!(c, a);
    }

    #[test]
    fn test_deserialize_rejects_confirmed_without_items() {
        let mut snapshot = new_order("T1").snapshot();
        snapshot.status = OrderStatus::Confirmed;

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(serde_json::from_str::<Order>(&json).is_err());
        assert!(matches!(Order::restore(snapshot), Err(OrderError::InvalidSnapshot(_))));
    }

    #[test]
    fn test_restore_rejects_duplicate_lines() {
        let mut order = new_order("T1");
        order.add_item(pizza()).unwrap();
        let mut snapshot = order.snapshot();
        snapshot.items.push(snapshot.items[0].clone());

        assert!(matches!(Order::restore(snapshot), Err(OrderError::InvalidSnapshot(_))));
    }

    #[test]
    fn test_load_from_events_full_lifecycle() {
        let seq = AtomicOrderIdSequencer::starting_at(5);
        let opened = Order::opening_event(&seq, TableRef::new("T1"), vec![]).unwrap();
        let mut order = Order::apply_first_event(&opened).unwrap();

        let mut events = vec![opened];
        let commands = [
            OrderCommand::AddItem { item: pizza() },
            OrderCommand::ConfirmOrder,
            OrderCommand::AdvanceOrder,
            OrderCommand::AdvanceOrder,
        ];
        for command in &commands {
            events.extend(order.execute(command).unwrap());
        }

        let envelopes: Vec<_> = events
            .into_iter()
            .zip(1..)
            .map(|(event, n)| EventEnvelope::new(order.order_id(), n, event, Uuid::new_v4()))
            .collect();

        let loaded = Order::load_from_events(&envelopes).unwrap();
        assert_eq!(loaded.version(), 5);
        assert_eq!(loaded.status(), OrderStatus::Served);
        assert_eq!(loaded, order);
    }

    #[test]
    fn test_load_from_events_rejects_gaps() {
        let seq = AtomicOrderIdSequencer::default();
        let opened = Order::opening_event(&seq, TableRef::new("T1"), vec![pizza()]).unwrap();
        let confirmed = OrderEvent::Confirmed(OrderConfirmed { confirmed_at: Utc::now() });

        let envelopes = vec![
            EventEnvelope::new(OrderId(1), 1, opened, Uuid::new_v4()),
            EventEnvelope::new(OrderId(1), 3, confirmed, Uuid::new_v4()),
        ];

        assert!(Order::load_from_events(&envelopes).is_err());
    }

    #[test]
    fn test_replay_rejects_illegal_transition() {
        let order = new_order("T1");
        let mut replay = order.clone();

        let event = OrderEvent::Advanced(OrderAdvanced {
            from: OrderStatus::Open,
            to: OrderStatus::Paid,
            advanced_at: Utc::now(),
        });

        assert!(matches!(
            replay.apply_event(&event),
            Err(OrderError::IllegalTransition { from: OrderStatus::Open, to: OrderStatus::Paid })
        ));
        assert_eq!(replay, order);
    }

    #[test]
    fn test_apply_first_event_non_opened_fails() {
        let event = OrderEvent::Confirmed(OrderConfirmed { confirmed_at: Utc::now() });
        assert!(matches!(Order::apply_first_event(&event), Err(OrderError::NotInitialized)));
    }
}
