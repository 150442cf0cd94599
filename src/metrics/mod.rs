use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

// ============================================================================
// Metrics Module - Prometheus metrics for the order lifecycle
// ============================================================================
//
// - Orders opened, archived and currently live
// - Status transitions by target status
// - Accepted / rejected commands and their latency
//
// Exposed as Prometheus text via `render`; serving it is up to the embedder.
// ============================================================================

pub struct OrderMetrics {
    registry: Registry,

    pub orders_opened: IntCounter,
    pub orders_archived: IntCounter,
    pub orders_live: IntGauge,

    pub transitions: IntCounterVec,

    pub commands_handled: IntCounterVec,
    pub commands_failed: IntCounterVec,
    pub command_duration: HistogramVec,
}

impl OrderMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        // Order counts
        let orders_opened = IntCounter::new("orders_opened_total", "Total orders opened")?;
        registry.register(Box::new(orders_opened.clone()))?;

        let orders_archived = IntCounter::new(
            "orders_archived_total",
            "Total terminal orders moved out of the live set",
        )?;
        registry.register(Box::new(orders_archived.clone()))?;

        let orders_live = IntGauge::new("orders_live", "Orders currently held in the live set")?;
        registry.register(Box::new(orders_live.clone()))?;

        // Lifecycle
        let transitions = IntCounterVec::new(
            Opts::new("order_transitions_total", "Order status transitions by target status"),
            &["to"],
        )?;
        registry.register(Box::new(transitions.clone()))?;

        // Commands
        let commands_handled = IntCounterVec::new(
            Opts::new("order_commands_total", "Order commands accepted"),
            &["command"],
        )?;
        registry.register(Box::new(commands_handled.clone()))?;

        let commands_failed = IntCounterVec::new(
            Opts::new("order_commands_failed_total", "Order commands rejected"),
            &["command", "kind"],
        )?;
        registry.register(Box::new(commands_failed.clone()))?;

        let command_duration = HistogramVec::new(
            HistogramOpts::new("order_command_duration_seconds", "Order command handling duration")
                .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1]),
            &["command"],
        )?;
        registry.register(Box::new(command_duration.clone()))?;

        Ok(Self {
            registry,
            orders_opened,
            orders_archived,
            orders_live,
            transitions,
            commands_handled,
            commands_failed,
            command_duration,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_opened(&self) {
        self.orders_opened.inc();
        self.orders_live.inc();
        self.transitions.with_label_values(&["OPEN"]).inc();
    }

    pub fn record_archived(&self) {
        self.orders_archived.inc();
        self.orders_live.dec();
    }

    pub fn record_command(&self, command: &str, duration_secs: f64, failure_kind: Option<&str>) {
        match failure_kind {
            None => self.commands_handled.with_label_values(&[command]).inc(),
            Some(kind) => self.commands_failed.with_label_values(&[command, kind]).inc(),
        }
        self.command_duration.with_label_values(&[command]).observe(duration_secs);
    }

    pub fn record_transition(&self, to: &str) {
        self.transitions.with_label_values(&[to]).inc();
    }

    /// Prometheus text exposition of every registered metric.
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = OrderMetrics::new().unwrap();
        metrics.record_opened();
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_lifecycle() {
        let metrics = OrderMetrics::new().unwrap();
        metrics.record_opened();
        metrics.record_opened();
        metrics.record_transition("PAID");
        metrics.record_archived();

        assert_eq!(metrics.orders_opened.get(), 2);
        assert_eq!(metrics.orders_live.get(), 1);
        assert_eq!(metrics.orders_archived.get(), 1);
        assert_eq!(metrics.transitions.with_label_values(&["OPEN"]).get(), 2);
        assert_eq!(metrics.transitions.with_label_values(&["PAID"]).get(), 1);
    }

    #[test]
    fn test_record_command_outcomes() {
        let metrics = OrderMetrics::new().unwrap();
        metrics.record_command("ConfirmOrder", 0.0002, None);
        metrics.record_command("ConfirmOrder", 0.0001, Some("validation"));

        assert_eq!(metrics.commands_handled.with_label_values(&["ConfirmOrder"]).get(), 1);
        assert_eq!(
            metrics.commands_failed.with_label_values(&["ConfirmOrder", "validation"]).get(),
            1
        );
        assert_eq!(
            metrics.command_duration.with_label_values(&["ConfirmOrder"]).get_sample_count(),
            2
        );
    }

    #[test]
    fn test_render_text_format() {
        let metrics = OrderMetrics::new().unwrap();
        metrics.record_opened();

        let text = metrics.render().unwrap();
        assert!(text.contains("orders_opened_total 1"));
        assert!(text.contains("orders_live 1"));
    }
}
