//! VPIN computation for the toxicity system.
//!
//! This crate handles:
//! - Volume bucket accumulation with tick-rule classification
//! - Rolling imbalance window and VPIN ratio
//! - Per-instrument engine registry with per-instrument locking
//! - Publication sinks for computed values

pub mod bucket;
pub mod window;
pub mod sink;
pub mod engine;

pub use bucket::BucketAccumulator;
pub use window::ImbalanceWindow;
pub use sink::{LogSink, MemorySink, VpinSink};
pub use engine::{InstrumentSnapshot, VpinEngine};
