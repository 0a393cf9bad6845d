//! Volume bucket accumulation.
//!
//! Accumulates classified tick volume until the running total exceeds the
//! bucket target. Landing exactly on the target leaves the bucket open. The
//! tick that crosses the target stays in the closing bucket in full; the next
//! bucket starts empty.

use vpin_core::{Tick, VolumeBucket, VolumeSplit};
use vpin_ingestion::classify;

/// Running state of the open volume bucket for one instrument.
#[derive(Debug, Clone)]
pub struct BucketAccumulator {
    /// Volume at which the bucket completes.
    bucket_volume: f64,
    /// Volume accumulated since the bucket opened.
    accumulated_volume: f64,
    /// Signed buy - sell volume since the bucket opened.
    accumulated_imbalance: f64,
}

impl BucketAccumulator {
    /// Create an empty accumulator with the given bucket target.
    pub fn new(bucket_volume: f64) -> Self {
        Self {
            bucket_volume,
            accumulated_volume: 0.0,
            accumulated_imbalance: 0.0,
        }
    }

    /// Classify a tick and add it to the open bucket.
    ///
    /// Returns the completed bucket when this tick takes the accumulated
    /// volume past the target.
    pub fn observe(&mut self, tick: &Tick) -> Option<VolumeBucket> {
        self.observe_split(&classify(tick))
    }

    /// Add an already classified volume split to the open bucket.
    pub fn observe_split(&mut self, split: &VolumeSplit) -> Option<VolumeBucket> {
        self.accumulated_volume += split.total();
        self.accumulated_imbalance += split.imbalance();

        if self.accumulated_volume > self.bucket_volume {
            let completed = VolumeBucket {
                imbalance: self.accumulated_imbalance.abs(),
                volume: self.accumulated_volume,
            };
            self.reset();
            Some(completed)
        } else {
            None
        }
    }

    /// Volume accumulated in the open bucket.
    pub fn accumulated_volume(&self) -> f64 {
        self.accumulated_volume
    }

    /// Signed imbalance accumulated in the open bucket.
    pub fn accumulated_imbalance(&self) -> f64 {
        self.accumulated_imbalance
    }

    /// Bucket target volume.
    pub fn bucket_volume(&self) -> f64 {
        self.bucket_volume
    }

    /// Fraction of the target filled so far.
    pub fn fill_ratio(&self) -> f64 {
        self.accumulated_volume / self.bucket_volume
    }

    /// Discard the open bucket.
    pub fn reset(&mut self) {
        self.accumulated_volume = 0.0;
        self.accumulated_imbalance = 0.0;
    }
}
