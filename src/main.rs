use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use restaurant_orders::event_sourcing::serialize_event;
use restaurant_orders::{
    OrderCommand, OrderCommandHandler, OrderError, OrderItem, OrderServiceConfig, TableRef,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = OrderServiceConfig::from_env()?;

    // RUST_LOG wins over the configured default
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    tracing::info!(?config, "Starting restaurant order service demo");

    let handler = OrderCommandHandler::from_config(&config)?;

    // === 1. Kitchen/billing observe transitions through the outbox ===
    let mut outbox = handler.event_store().subscribe();
    let observer = tokio::spawn(async move {
        while let Ok(envelope) = outbox.recv().await {
            tracing::info!(
                order_id = %envelope.aggregate_id,
                seq = envelope.sequence_number,
                event_type = %envelope.event_type,
                "Outbox event"
            );
        }
    });

    // === 2. Table T1: full happy path ===
    let correlation_id = Uuid::new_v4();
    let t1 = handler.open_order(TableRef::new("T1"), vec![], correlation_id).await?;
    for command in [
        OrderCommand::AddItem { item: OrderItem::new("pizza", 1) },
        OrderCommand::ConfirmOrder,
        OrderCommand::AdvanceOrder,
        OrderCommand::AdvanceOrder,
        OrderCommand::AdvanceOrder,
    ] {
        handler.handle(t1, command, correlation_id).await?;
    }
    report_rejection(handler.handle(t1, OrderCommand::AdvanceOrder, correlation_id).await);

    // === 3. Table T2: confirming an empty order is refused ===
    let correlation_id = Uuid::new_v4();
    let t2 = handler.open_order(TableRef::new("T2"), vec![], correlation_id).await?;
    report_rejection(handler.handle(t2, OrderCommand::ConfirmOrder, correlation_id).await);

    // === 4. Table T3: cancelled orders take no more items ===
    let correlation_id = Uuid::new_v4();
    let t3 = handler
        .open_order(TableRef::new("T3"), vec![OrderItem::new("A", 1)], correlation_id)
        .await?;
    handler.handle(t3, OrderCommand::CancelOrder, correlation_id).await?;
    report_rejection(
        handler
            .handle(t3, OrderCommand::AddItem { item: OrderItem::new("B", 1) }, correlation_id)
            .await,
    );

    // === 5. Final state ===
    for id in [t1, t2, t3] {
        let snapshot = handler.snapshot(id).await?;
        tracing::info!(order = %serialize_event(&snapshot)?, "Order snapshot");
    }
    tracing::info!(live = ?handler.live_orders().await, "Live orders");
    println!("{}", handler.metrics().render()?);

    drop(handler);
    observer.await?;

    tracing::info!("Demo complete");
    Ok(())
}

fn report_rejection(result: anyhow::Result<i64>) {
    match result {
        Ok(version) => tracing::error!(version, "Command unexpectedly accepted"),
        Err(err) => match err.downcast_ref::<OrderError>() {
            Some(order_err) => tracing::info!(kind = %order_err.kind(), error = %order_err, "Command rejected as expected"),
            None => tracing::error!(error = %err, "Command failed"),
        },
    }
}
