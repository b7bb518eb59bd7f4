// Private module declaration
mod server;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Order creation (throughput, failures by cause)
// - Status transitions (applied vs idempotent no-op)
// - Product validation RPC (call outcomes, latency)
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Central metrics registry for the service
pub struct Metrics {
    registry: Registry,

    // Order Workflow Metrics
    pub orders_created: IntCounter,
    pub order_failures: IntCounterVec,
    pub status_transitions: IntCounterVec,

    // Product Validation Metrics
    pub product_validation_calls: IntCounterVec,
    pub product_validation_duration: Histogram,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_created = IntCounter::new(
            "orders_created_total",
            "Total orders created successfully",
        )?;
        registry.register(Box::new(orders_created.clone()))?;

        let order_failures = IntCounterVec::new(
            Opts::new("order_failures_total", "Failed order operations"),
            &["operation", "cause"],
        )?;
        registry.register(Box::new(order_failures.clone()))?;

        let status_transitions = IntCounterVec::new(
            Opts::new("order_status_transitions_total", "Status transition requests"),
            &["outcome"],
        )?;
        registry.register(Box::new(status_transitions.clone()))?;

        let product_validation_calls = IntCounterVec::new(
            Opts::new(
                "product_validation_calls_total",
                "Product validation RPC calls",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(product_validation_calls.clone()))?;

        let product_validation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "product_validation_duration_seconds",
                "Product validation RPC duration",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(product_validation_duration.clone()))?;

        Ok(Self {
            registry,
            orders_created,
            order_failures,
            status_transitions,
            product_validation_calls,
            product_validation_duration,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Helper to record a successful creation
    pub fn record_order_created(&self) {
        self.orders_created.inc();
    }

    /// Helper to record a failed operation by cause
    pub fn record_order_failure(&self, operation: &str, cause: &str) {
        self.order_failures.with_label_values(&[operation, cause]).inc();
    }

    /// Helper to record a status transition outcome
    pub fn record_status_transition(&self, applied: bool) {
        let outcome = if applied { "applied" } else { "noop" };
        self.status_transitions.with_label_values(&[outcome]).inc();
    }

    /// Helper to record a product validation call
    pub fn record_product_validation(&self, duration_secs: f64, success: bool) {
        let outcome = if success { "ok" } else { "error" };
        self.product_validation_calls.with_label_values(&[outcome]).inc();
        self.product_validation_duration.observe(duration_secs);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}
