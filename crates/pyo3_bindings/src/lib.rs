//! PyO3 bindings for the VPIN toxicity components.
//!
//! Exposes the Rust implementations to Python:
//! - Tick decoding and tick-rule classification
//! - The per-instrument VPIN engine

use std::sync::Arc;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use vpin_core::{
    Error as RustError,
    Tick as RustTick,
    TradeSide as RustTradeSide,
    VolumeBucket as RustVolumeBucket,
    VolumeSplit as RustVolumeSplit,
    VpinConfig as RustVpinConfig,
    VpinResult as RustVpinResult,
};
use vpin_engine::{InstrumentSnapshot as RustInstrumentSnapshot, MemorySink, VpinEngine};

fn to_py_err(err: RustError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

// ============================================================================
// Python-exposed Types
// ============================================================================

/// A trade tick for one instrument.
#[pyclass]
#[derive(Clone)]
pub struct Tick {
    #[pyo3(get, set)]
    pub instrument: String,
    #[pyo3(get, set)]
    pub open: f64,
    #[pyo3(get, set)]
    pub close: f64,
    #[pyo3(get, set)]
    pub volume: f64,
    #[pyo3(get, set)]
    pub ts_ms: Option<i64>,
    high: f64,
    low: f64,
}

#[pymethods]
impl Tick {
    #[new]
    #[pyo3(signature = (instrument, open, close, volume, ts_ms=None))]
    fn new(instrument: String, open: f64, close: f64, volume: f64, ts_ms: Option<i64>) -> Self {
        Tick {
            instrument,
            open,
            close,
            volume,
            ts_ms,
            high: open.max(close),
            low: open.min(close),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "Tick(instrument={}, open={}, close={}, volume={})",
            self.instrument, self.open, self.close, self.volume
        )
    }
}

impl From<&Tick> for RustTick {
    fn from(t: &Tick) -> Self {
        RustTick {
            instrument: t.instrument.clone(),
            ts_ms: t.ts_ms,
            open: t.open,
            high: t.high,
            low: t.low,
            close: t.close,
            volume: t.volume,
        }
    }
}

impl From<RustTick> for Tick {
    fn from(t: RustTick) -> Self {
        Tick {
            instrument: t.instrument,
            open: t.open,
            close: t.close,
            volume: t.volume,
            ts_ms: t.ts_ms,
            high: t.high,
            low: t.low,
        }
    }
}

/// Tick-rule side.
#[pyclass(eq, eq_int)]
#[derive(Clone, Copy, PartialEq)]
pub enum TradeSide {
    Buy = 1,
    Sell = -1,
    Neutral = 0,
}

#[pymethods]
impl TradeSide {
    #[getter]
    fn sign(&self) -> i8 {
        match self {
            TradeSide::Buy => 1,
            TradeSide::Sell => -1,
            TradeSide::Neutral => 0,
        }
    }
}

impl From<RustTradeSide> for TradeSide {
    fn from(s: RustTradeSide) -> Self {
        match s {
            RustTradeSide::Buy => TradeSide::Buy,
            RustTradeSide::Sell => TradeSide::Sell,
            RustTradeSide::Neutral => TradeSide::Neutral,
        }
    }
}

/// Buy/sell split of a tick's volume.
#[pyclass]
#[derive(Clone)]
pub struct VolumeSplit {
    #[pyo3(get)]
    pub side: TradeSide,
    #[pyo3(get)]
    pub buy_volume: f64,
    #[pyo3(get)]
    pub sell_volume: f64,
}

#[pymethods]
impl VolumeSplit {
    #[getter]
    fn imbalance(&self) -> f64 {
        self.buy_volume - self.sell_volume
    }
}

impl From<RustVolumeSplit> for VolumeSplit {
    fn from(s: RustVolumeSplit) -> Self {
        VolumeSplit {
            side: s.side.into(),
            buy_volume: s.buy_volume,
            sell_volume: s.sell_volume,
        }
    }
}

/// A completed volume bucket.
#[pyclass]
#[derive(Clone)]
pub struct VolumeBucket {
    #[pyo3(get)]
    pub imbalance: f64,
    #[pyo3(get)]
    pub volume: f64,
}

impl From<RustVolumeBucket> for VolumeBucket {
    fn from(b: RustVolumeBucket) -> Self {
        VolumeBucket {
            imbalance: b.imbalance,
            volume: b.volume,
        }
    }
}

/// VPIN value emitted on bucket completion.
#[pyclass]
#[derive(Clone)]
pub struct VpinResult {
    #[pyo3(get)]
    pub instrument: String,
    #[pyo3(get)]
    pub vpin: f64,
    #[pyo3(get)]
    pub bucket_count: usize,
    #[pyo3(get)]
    pub ts_ms: Option<i64>,
}

#[pymethods]
impl VpinResult {
    fn __repr__(&self) -> String {
        format!(
            "VpinResult(instrument={}, vpin={:.4}, bucket_count={})",
            self.instrument, self.vpin, self.bucket_count
        )
    }
}

impl From<RustVpinResult> for VpinResult {
    fn from(r: RustVpinResult) -> Self {
        VpinResult {
            instrument: r.instrument,
            vpin: r.vpin,
            bucket_count: r.bucket_count,
            ts_ms: r.ts_ms,
        }
    }
}

/// Point-in-time copy of one instrument's state.
#[pyclass]
#[derive(Clone)]
pub struct InstrumentSnapshot {
    #[pyo3(get)]
    pub instrument: String,
    #[pyo3(get)]
    pub accumulated_volume: f64,
    #[pyo3(get)]
    pub accumulated_imbalance: f64,
    #[pyo3(get)]
    pub buckets: Vec<VolumeBucket>,
    #[pyo3(get)]
    pub last_vpin: Option<f64>,
    #[pyo3(get)]
    pub buckets_completed: u64,
    #[pyo3(get)]
    pub total_ticks: u64,
    #[pyo3(get)]
    pub total_volume: f64,
}

impl From<RustInstrumentSnapshot> for InstrumentSnapshot {
    fn from(s: RustInstrumentSnapshot) -> Self {
        InstrumentSnapshot {
            instrument: s.instrument,
            accumulated_volume: s.accumulated_volume,
            accumulated_imbalance: s.accumulated_imbalance,
            buckets: s.buckets.into_iter().map(|b| b.into()).collect(),
            last_vpin: s.last_vpin,
            buckets_completed: s.buckets_completed,
            total_ticks: s.stats.total_ticks,
            total_volume: s.stats.total_volume,
        }
    }
}

// ============================================================================
// Python-exposed Functions
// ============================================================================

/// Decode and validate a JSON tick message.
#[pyfunction]
fn decode_tick(raw: &str) -> PyResult<Tick> {
    vpin_ingestion::decode_tick(raw)
        .map(|t| t.into())
        .map_err(to_py_err)
}

/// Classify a tick's volume with the tick rule.
#[pyfunction]
fn classify(tick: &Tick) -> VolumeSplit {
    vpin_ingestion::classify(&tick.into()).into()
}

// ============================================================================
// Python-exposed Engine Classes
// ============================================================================

/// Per-instrument VPIN engine.
///
/// Results are returned from `process_tick` and also retained until
/// `drain_results` is called.
#[pyclass(name = "VpinEngine")]
pub struct PyVpinEngine {
    inner: VpinEngine,
    sink: Arc<MemorySink>,
}

#[pymethods]
impl PyVpinEngine {
    #[new]
    #[pyo3(signature = (bucket_volume=100_000.0, window_size=50))]
    fn new(bucket_volume: f64, window_size: usize) -> PyResult<Self> {
        let config = RustVpinConfig::new(bucket_volume, window_size).map_err(to_py_err)?;
        let sink = Arc::new(MemorySink::new());
        let inner = VpinEngine::with_sink(config, sink.clone()).map_err(to_py_err)?;
        Ok(PyVpinEngine { inner, sink })
    }

    /// Process one tick; returns a result when it completes a bucket.
    fn process_tick(&self, tick: &Tick) -> PyResult<Option<VpinResult>> {
        self.inner
            .process_tick(&tick.into())
            .map(|r| r.map(|r| r.into()))
            .map_err(to_py_err)
    }

    /// Process ticks in order, skipping rejected ones.
    fn process_batch(&self, ticks: Vec<Tick>) -> Vec<VpinResult> {
        ticks
            .iter()
            .filter_map(|t| self.inner.process_tick(&t.into()).ok().flatten())
            .map(|r| r.into())
            .collect()
    }

    /// Drain every result produced so far.
    fn drain_results(&self) -> Vec<VpinResult> {
        self.sink.take().into_iter().map(|r| r.into()).collect()
    }

    /// Last VPIN for an instrument.
    fn last_vpin(&self, instrument: &str) -> Option<f64> {
        self.inner.last_vpin(instrument)
    }

    /// Snapshot of an instrument's state.
    fn snapshot(&self, instrument: &str) -> Option<InstrumentSnapshot> {
        self.inner.snapshot(instrument).map(|s| s.into())
    }

    /// Instruments seen so far.
    fn instruments(&self) -> Vec<String> {
        self.inner.instruments()
    }

    /// Stop tracking an instrument.
    fn remove(&self, instrument: &str) -> bool {
        self.inner.remove(instrument)
    }

    /// Clear all state.
    fn clear(&self) {
        self.inner.clear();
        self.sink.take();
    }
}

// ============================================================================
// Module Definition
// ============================================================================

/// VPIN Core - Rust VPIN engine for Python.
#[pymodule]
fn vpin_core_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Types
    m.add_class::<Tick>()?;
    m.add_class::<TradeSide>()?;
    m.add_class::<VolumeSplit>()?;
    m.add_class::<VolumeBucket>()?;
    m.add_class::<VpinResult>()?;
    m.add_class::<InstrumentSnapshot>()?;

    // Functions
    m.add_function(wrap_pyfunction!(decode_tick, m)?)?;
    m.add_function(wrap_pyfunction!(classify, m)?)?;

    // Engine classes
    m.add_class::<PyVpinEngine>()?;

    Ok(())
}
