//! Prometheus metrics for request handling and heartbeat workers

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,
    pub http_requests_total: IntCounter,
    pub http_request_duration_seconds: Histogram,
    pub http_requests_in_flight: IntGauge,
    pub heartbeat_pulses_sent_total: IntCounter,
    pub heartbeat_pulses_dropped_total: IntCounter,
    pub heartbeat_results_delivered_total: IntCounter,
}

impl Metrics {
    /// Build a fresh registry; every instance is independent of the others.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let http_requests_total =
            IntCounter::new("http_requests_total", "Total number of HTTP requests")?;
        let http_request_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        ))?;
        let http_requests_in_flight = IntGauge::new(
            "http_requests_in_flight",
            "Number of HTTP requests currently being served",
        )?;
        let heartbeat_pulses_sent_total = IntCounter::new(
            "heartbeat_pulses_sent_total",
            "Pulses accepted by a listening consumer",
        )?;
        let heartbeat_pulses_dropped_total = IntCounter::new(
            "heartbeat_pulses_dropped_total",
            "Pulses dropped because no consumer was ready",
        )?;
        let heartbeat_results_delivered_total = IntCounter::new(
            "heartbeat_results_delivered_total",
            "Work results delivered to the consumer",
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_requests_in_flight.clone()))?;
        registry.register(Box::new(heartbeat_pulses_sent_total.clone()))?;
        registry.register(Box::new(heartbeat_pulses_dropped_total.clone()))?;
        registry.register(Box::new(heartbeat_results_delivered_total.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            http_requests_in_flight,
            heartbeat_pulses_sent_total,
            heartbeat_pulses_dropped_total,
            heartbeat_results_delivered_total,
        })
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn export(&self) -> prometheus::Result<String> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}
