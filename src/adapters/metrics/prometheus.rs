//! Prometheus Metrics Registry - Price Subsystem Observability
//!
//! Counters and gauges for feed traffic, REST fallback outcomes, cell
//! writes, cache size and channel state. Implements [`PriceTelemetry`] so
//! the use cases can report without knowing about Prometheus.

use anyhow::Result;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::ports::telemetry::PriceTelemetry;

/// Centralized Prometheus metrics. All names start with `ltp_`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Feed frames by classified shape (`dropped` for unrecognized).
    pub feed_messages: IntCounterVec,
    /// Fallback requests by outcome (`ok` / `error`).
    pub fallback_requests: IntCounterVec,
    /// Price cell writes.
    pub cell_writes: IntCounter,
    /// Entries in the price cache.
    pub cache_entries: IntGauge,
    /// Streaming channel status (1 = open).
    pub channel_open: IntGauge,
}

impl MetricsRegistry {
    /// Create and register all metrics.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let feed_messages = IntCounterVec::new(
            Opts::new("ltp_feed_messages_total", "Streaming feed frames by shape"),
            &["shape"],
        )?;

        let fallback_requests = IntCounterVec::new(
            Opts::new("ltp_fallback_requests_total", "REST LTP requests by outcome"),
            &["outcome"],
        )?;

        let cell_writes = IntCounter::new("ltp_cell_writes_total", "Price cell writes applied")?;

        let cache_entries = IntGauge::new("ltp_cache_entries", "Entries in the price cache")?;

        let channel_open = IntGauge::new(
            "ltp_channel_open",
            "Streaming channel status (1=open, 0=not open)",
        )?;

        registry.register(Box::new(feed_messages.clone()))?;
        registry.register(Box::new(fallback_requests.clone()))?;
        registry.register(Box::new(cell_writes.clone()))?;
        registry.register(Box::new(cache_entries.clone()))?;
        registry.register(Box::new(channel_open.clone()))?;

        Ok(Self {
            registry,
            feed_messages,
            fallback_requests,
            cell_writes,
            cache_entries,
            channel_open,
        })
    }

    /// Text exposition of every registered metric.
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl PriceTelemetry for MetricsRegistry {
    fn feed_message(&self, shape: &str) {
        self.feed_messages.with_label_values(&[shape]).inc();
    }

    fn fallback_request(&self, ok: bool) {
        let outcome = if ok { "ok" } else { "error" };
        self.fallback_requests.with_label_values(&[outcome]).inc();
    }

    fn cell_writes(&self, count: usize) {
        self.cell_writes.inc_by(count as u64);
    }

    #[allow(clippy::cast_possible_wrap)]
    fn cache_entries(&self, count: usize) {
        self.cache_entries.set(count as i64);
    }

    fn channel_open(&self, open: bool) {
        self.channel_open.set(i64::from(open));
    }
}
