//! Publication sinks for computed VPIN values.

use parking_lot::Mutex;
use tracing::info;
use vpin_core::VpinResult;

/// Consumer notified on every bucket completion that yields a VPIN value.
///
/// Called from whichever thread processed the tick, after the instrument's
/// state lock has been released.
pub trait VpinSink: Send + Sync {
    /// Receive a freshly computed VPIN value.
    fn publish(&self, result: &VpinResult);
}

impl<F> VpinSink for F
where
    F: Fn(&VpinResult) + Send + Sync,
{
    fn publish(&self, result: &VpinResult) {
        self(result)
    }
}

/// Writes each result as a structured log event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl VpinSink for LogSink {
    fn publish(&self, result: &VpinResult) {
        info!(
            instrument = %result.instrument,
            vpin = result.vpin,
            buckets = result.bucket_count,
            "VPIN updated"
        );
    }
}

/// Collects results in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    results: Mutex<Vec<VpinResult>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything published so far.
    pub fn results(&self) -> Vec<VpinResult> {
        self.results.lock().clone()
    }

    /// Results for one instrument, in publication order.
    pub fn results_for(&self, instrument: &str) -> Vec<VpinResult> {
        self.results
            .lock()
            .iter()
            .filter(|r| r.instrument == instrument)
            .cloned()
            .collect()
    }

    /// Drain everything published so far.
    pub fn take(&self) -> Vec<VpinResult> {
        std::mem::take(&mut *self.results.lock())
    }

    /// Number of results held.
    pub fn len(&self) -> usize {
        self.results.lock().len()
    }

    /// Whether nothing has been published.
    pub fn is_empty(&self) -> bool {
        self.results.lock().is_empty()
    }
}

impl VpinSink for MemorySink {
    fn publish(&self, result: &VpinResult) {
        self.results.lock().push(result.clone());
    }
}
