//! VPIN calculation engine.
//!
//! Routes each tick to its instrument's bucket accumulator and rolling window,
//! creating that state on first sight.
//!
//! Every instrument owns its own lock. The registry lock is only held long
//! enough to find or insert an instrument's handle, so ticks for different
//! instruments are processed in parallel while ticks for the same instrument
//! are serialized.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use vpin_core::{Result, Tick, VolumeBucket, VpinConfig, VpinResult};
use vpin_ingestion::{classify, ClassificationStats};

use crate::bucket::BucketAccumulator;
use crate::sink::{LogSink, VpinSink};
use crate::window::ImbalanceWindow;

/// Mutable VPIN state for a single instrument.
#[derive(Debug, Clone)]
struct InstrumentState {
    bucket: BucketAccumulator,
    window: ImbalanceWindow,
    stats: ClassificationStats,
    buckets_completed: u64,
}

impl InstrumentState {
    fn new(config: &VpinConfig) -> Self {
        Self {
            bucket: BucketAccumulator::new(config.bucket_volume),
            window: ImbalanceWindow::new(config.window_size),
            stats: ClassificationStats::default(),
            buckets_completed: 0,
        }
    }

    /// Accumulate a tick; returns a result when it closes a bucket.
    fn observe(&mut self, tick: &Tick) -> Option<VpinResult> {
        let split = classify(tick);
        self.stats.record(&split);

        let completed = self.bucket.observe_split(&split)?;
        self.buckets_completed += 1;

        debug!(
            instrument = %tick.instrument,
            volume = completed.volume,
            imbalance = completed.imbalance,
            "bucket completed"
        );

        let vpin = self.window.push(completed)?;
        Some(VpinResult {
            instrument: tick.instrument.clone(),
            vpin,
            bucket_count: self.window.len(),
            ts_ms: tick.ts_ms,
        })
    }

    fn snapshot(&self, instrument: &str) -> InstrumentSnapshot {
        InstrumentSnapshot {
            instrument: instrument.to_string(),
            accumulated_volume: self.bucket.accumulated_volume(),
            accumulated_imbalance: self.bucket.accumulated_imbalance(),
            buckets: self.window.buckets().copied().collect(),
            last_vpin: self.window.last_vpin(),
            buckets_completed: self.buckets_completed,
            stats: self.stats.clone(),
        }
    }
}

/// Point-in-time copy of one instrument's state.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSnapshot {
    /// Instrument symbol.
    pub instrument: String,
    /// Volume in the open bucket.
    pub accumulated_volume: f64,
    /// Signed imbalance in the open bucket.
    pub accumulated_imbalance: f64,
    /// Completed buckets in the window, oldest first.
    pub buckets: Vec<VolumeBucket>,
    /// Last emitted VPIN.
    pub last_vpin: Option<f64>,
    /// Buckets completed since the instrument was first seen.
    pub buckets_completed: u64,
    /// Tick classification counters.
    pub stats: ClassificationStats,
}

type StateHandle = Arc<Mutex<InstrumentState>>;

/// Per-instrument VPIN engine.
pub struct VpinEngine {
    config: VpinConfig,
    registry: RwLock<HashMap<String, StateHandle>>,
    sink: Arc<dyn VpinSink>,
}

impl VpinEngine {
    /// Create an engine that logs every result.
    pub fn new(config: VpinConfig) -> Result<Self> {
        Self::with_sink(config, Arc::new(LogSink))
    }

    /// Create an engine publishing results to the given sink.
    pub fn with_sink(config: VpinConfig, sink: Arc<dyn VpinSink>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry: RwLock::new(HashMap::new()),
            sink,
        })
    }

    /// Process one tick.
    ///
    /// Returns `Ok(Some(_))` when the tick completed a bucket and a VPIN value
    /// was computed, `Ok(None)` otherwise. Ticks failing [`Tick::check`] are
    /// rejected before any state is touched.
    pub fn process_tick(&self, tick: &Tick) -> Result<Option<VpinResult>> {
        if let Err(err) = tick.check() {
            warn!(instrument = %tick.instrument, error = %err, "rejecting tick");
            return Err(err);
        }

        let handle = self.state_for(&tick.instrument);
        let result = handle.lock().observe(tick);

        if let Some(result) = &result {
            self.sink.publish(result);
        }
        Ok(result)
    }

    /// Find or atomically create the state for an instrument.
    fn state_for(&self, instrument: &str) -> StateHandle {
        if let Some(handle) = self.registry.read().get(instrument) {
            return Arc::clone(handle);
        }

        let mut registry = self.registry.write();
        let handle = registry.entry(instrument.to_string()).or_insert_with(|| {
            debug!(instrument, "tracking new instrument");
            Arc::new(Mutex::new(InstrumentState::new(&self.config)))
        });
        Arc::clone(handle)
    }

    fn handle(&self, instrument: &str) -> Option<StateHandle> {
        self.registry.read().get(instrument).cloned()
    }

    /// Last VPIN emitted for an instrument.
    pub fn last_vpin(&self, instrument: &str) -> Option<f64> {
        self.handle(instrument)?.lock().window.last_vpin()
    }

    /// Snapshot of an instrument's state.
    pub fn snapshot(&self, instrument: &str) -> Option<InstrumentSnapshot> {
        let handle = self.handle(instrument)?;
        let state = handle.lock();
        Some(state.snapshot(instrument))
    }

    /// Instruments seen so far, sorted.
    pub fn instruments(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of instruments tracked.
    pub fn instrument_count(&self) -> usize {
        self.registry.read().len()
    }

    /// Stop tracking an instrument, dropping its buckets.
    ///
    /// A later tick for the same instrument starts from empty state.
    pub fn remove(&self, instrument: &str) -> bool {
        let removed = self.registry.write().remove(instrument).is_some();
        if removed {
            debug!(instrument, "instrument removed");
        }
        removed
    }

    /// Drop all instrument state.
    pub fn clear(&self) {
        self.registry.write().clear();
    }

    /// Engine configuration.
    pub fn config(&self) -> &VpinConfig {
        &self.config
    }
}
