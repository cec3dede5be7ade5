//! Telemetry Port - Price Subsystem Counters
//!
//! Lets the use cases report activity without depending on the metrics
//! backend. [`NoopTelemetry`] is used where nothing is exported.

pub trait PriceTelemetry: Send + Sync + 'static {
    /// A feed frame was classified (`shape`) or dropped (`"dropped"`).
    fn feed_message(&self, shape: &str);

    /// A fallback request completed.
    fn fallback_request(&self, ok: bool);

    /// Cell writes applied to the display.
    fn cell_writes(&self, count: usize);

    /// Current number of cache entries.
    fn cache_entries(&self, count: usize);

    /// Whether the streaming channel is open.
    fn channel_open(&self, open: bool);
}

/// Telemetry sink that records nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl PriceTelemetry for NoopTelemetry {
    fn feed_message(&self, _shape: &str) {}
    fn fallback_request(&self, _ok: bool) {}
    fn cell_writes(&self, _count: usize) {}
    fn cache_entries(&self, _count: usize) {}
    fn channel_open(&self, _open: bool) {}
}
