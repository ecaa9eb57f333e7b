// metrics.rs - Prometheus metrics for the quote pipeline

use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Total quote updates processed, per symbol
    pub static ref UPDATES_PROCESSED: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "ticker_updates_total",
            "Total number of quote updates processed"
        ),
        &["symbol"]
    ).expect("Failed to create updates_total metric");

    /// Total anomalies detected, per symbol and kind
    pub static ref ANOMALIES_DETECTED: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "ticker_anomalies_total",
            "Total number of anomalies detected"
        ),
        &["symbol", "type"]
    ).expect("Failed to create anomalies_total metric");

    /// Current number of connected WebSocket subscribers
    pub static ref ACTIVE_CONNECTIONS: IntGauge = IntGauge::new(
        "ticker_active_connections",
        "Current number of active WebSocket connections"
    ).expect("Failed to create active_connections metric");

    /// Messages dropped because a subscriber queue was full
    pub static ref MESSAGES_DROPPED: IntCounter = IntCounter::new(
        "ticker_dropped_messages_total",
        "Total number of messages dropped for slow subscribers"
    ).expect("Failed to create dropped_messages metric");

    /// Upstream polls that ended in an error
    pub static ref POLL_ERRORS: IntCounter = IntCounter::new(
        "ticker_poll_errors_total",
        "Total number of failed upstream polls"
    ).expect("Failed to create poll_errors metric");

    /// Histogram of database write durations
    pub static ref DB_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "ticker_db_latency_seconds",
            "Latency of database operations in seconds"
        )
    ).expect("Failed to create db_latency metric");
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<(), prometheus::Error> {
    REGISTRY.register(Box::new(UPDATES_PROCESSED.clone()))?;
    REGISTRY.register(Box::new(ANOMALIES_DETECTED.clone()))?;
    REGISTRY.register(Box::new(ACTIVE_CONNECTIONS.clone()))?;
    REGISTRY.register(Box::new(MESSAGES_DROPPED.clone()))?;
    REGISTRY.register(Box::new(POLL_ERRORS.clone()))?;
    REGISTRY.register(Box::new(DB_LATENCY.clone()))?;
    Ok(())
}

/// Render the registry in the Prometheus text exposition format.
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;

    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("metrics not valid UTF-8: {}", e)))
}
