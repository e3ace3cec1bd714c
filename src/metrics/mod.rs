use std::time::Duration;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Order ingestion (throughput, latency, failures by class)
// - Retry and dead-letter routing
// - The retry relay and dead-letter persistence
//
// All metrics live in an explicit registry owned by this struct; an instance
// is created in main and shared via Arc. Nothing is registered globally.
// ============================================================================

/// Central metrics registry for the entire application
pub struct Metrics {
    registry: Registry,

    // Ingestion Metrics
    pub orders_processed: IntCounter,
    pub orders_failed: IntCounterVec,
    pub processing_duration: Histogram,

    // Escalation Metrics
    pub orders_retried: IntCounter,
    pub orders_dead_lettered: IntCounter,

    // Retry Relay / Dead-Letter Store Metrics
    pub retries_relayed: IntCounter,
    pub dead_letters_stored: IntCounter,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        // Ingestion Metrics
        let orders_processed = IntCounter::new(
            "orders_processed_total",
            "Orders decoded, validated and persisted",
        )?;
        registry.register(Box::new(orders_processed.clone()))?;

        let orders_failed = IntCounterVec::new(
            Opts::new(
                "orders_failed_total",
                "Orders that failed processing, by failure class",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(orders_failed.clone()))?;

        let processing_duration = Histogram::with_opts(
            HistogramOpts::new(
                "order_processing_seconds",
                "Time spent handling a single order message",
            )
            .buckets(prometheus::linear_buckets(0.01, 0.05, 20)?),
        )?;
        registry.register(Box::new(processing_duration.clone()))?;

        // Escalation Metrics
        let orders_retried = IntCounter::new(
            "orders_retry_total",
            "Orders routed to the retry stream",
        )?;
        registry.register(Box::new(orders_retried.clone()))?;

        let orders_dead_lettered = IntCounter::new(
            "orders_dlq_total",
            "Orders routed to the dead-letter stream",
        )?;
        registry.register(Box::new(orders_dead_lettered.clone()))?;

        // Retry Relay / Dead-Letter Store Metrics
        let retries_relayed = IntCounter::new(
            "retry_relayed_total",
            "Retry messages republished to the main stream",
        )?;
        registry.register(Box::new(retries_relayed.clone()))?;

        let dead_letters_stored = IntCounter::new(
            "dead_letters_stored_total",
            "Dead-letter records persisted for inspection",
        )?;
        registry.register(Box::new(dead_letters_stored.clone()))?;

        Ok(Self {
            registry,
            orders_processed,
            orders_failed,
            processing_duration,
            orders_retried,
            orders_dead_lettered,
            retries_relayed,
            dead_letters_stored,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Helper to record a fully processed order and its handling latency
    pub fn record_processed(&self, duration: Duration) {
        self.orders_processed.inc();
        self.processing_duration.observe(duration.as_secs_f64());
    }

    /// Helper to record a failed message, labelled by failure class
    pub fn record_failure(&self, reason: &str) {
        self.orders_failed.with_label_values(&[reason]).inc();
    }

    /// Helper to record a message handed to the retry stream
    pub fn record_retry_route(&self) {
        self.orders_retried.inc();
    }

    /// Helper to record a message handed to the dead-letter stream
    pub fn record_dlq_route(&self) {
        self.orders_dead_lettered.inc();
    }

    /// Helper to record a retry message republished to the main stream
    pub fn record_relay(&self) {
        self.retries_relayed.inc();
    }

    /// Helper to record a dead letter written to the store
    pub fn record_dead_letter_stored(&self) {
        self.dead_letters_stored.inc();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}
