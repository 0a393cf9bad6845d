//! Core data types for the VPIN toxicity system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Timestamp in milliseconds since Unix epoch (UTC).
pub type TimestampMs = i64;

/// Size/quantity type.
pub type Size = f64;

/// A decoded trade tick for one instrument.
///
/// Produced by the decode stage and consumed read-only by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Instrument symbol (e.g., "SPY").
    pub instrument: String,
    /// Event timestamp in milliseconds, when the source supplied a parseable one.
    pub ts_ms: Option<TimestampMs>,
    /// Open price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Close price.
    pub close: f64,
    /// Traded volume over the tick.
    pub volume: Size,
}

impl Tick {
    /// Create a tick with only the fields the engine reads.
    ///
    /// High and low are set to the open/close envelope.
    pub fn new(instrument: impl Into<String>, open: f64, close: f64, volume: Size) -> Self {
        Self {
            instrument: instrument.into(),
            ts_ms: None,
            open,
            high: open.max(close),
            low: open.min(close),
            close,
            volume,
        }
    }

    /// Attach an event timestamp.
    pub fn with_ts(mut self, ts_ms: TimestampMs) -> Self {
        self.ts_ms = Some(ts_ms);
        self
    }

    /// Event time as a UTC datetime.
    pub fn event_time(&self) -> Option<DateTime<Utc>> {
        self.ts_ms.and_then(DateTime::from_timestamp_millis)
    }

    /// Check the invariants the engine relies on.
    ///
    /// Volume must be finite and non-negative, open and close must be finite and
    /// the instrument must be non-empty.
    pub fn check(&self) -> Result<()> {
        if self.instrument.trim().is_empty() {
            return Err(Error::precondition("<empty>", "instrument is empty"));
        }
        if !self.volume.is_finite() {
            return Err(Error::precondition(&self.instrument, "volume is not finite"));
        }
        if self.volume < 0.0 {
            return Err(Error::precondition(
                &self.instrument,
                format!("volume is negative ({})", self.volume),
            ));
        }
        if !self.open.is_finite() || !self.close.is_finite() {
            return Err(Error::precondition(&self.instrument, "price is not finite"));
        }
        Ok(())
    }
}

/// Direction inferred for a tick's volume by the tick rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i8)]
pub enum TradeSide {
    /// Close above open (buyer-initiated).
    Buy = 1,
    /// Close below open (seller-initiated).
    Sell = -1,
    /// Unchanged price, volume split evenly.
    Neutral = 0,
}

impl TradeSide {
    /// Classify by comparing close against open.
    #[inline]
    pub fn from_prices(open: f64, close: f64) -> Self {
        if close > open {
            TradeSide::Buy
        } else if close < open {
            TradeSide::Sell
        } else {
            TradeSide::Neutral
        }
    }

    /// Get the sign as i8.
    #[inline]
    pub fn sign(self) -> i8 {
        self as i8
    }
}

/// Buy/sell split of one tick's volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeSplit {
    /// Inferred side.
    pub side: TradeSide,
    /// Buy-initiated volume.
    pub buy_volume: Size,
    /// Sell-initiated volume.
    pub sell_volume: Size,
}

impl VolumeSplit {
    /// Total volume (buy + sell).
    #[inline]
    pub fn total(&self) -> Size {
        self.buy_volume + self.sell_volume
    }

    /// Signed imbalance contribution: buy - sell.
    #[inline]
    pub fn imbalance(&self) -> f64 {
        self.buy_volume - self.sell_volume
    }
}

/// A completed volume bucket as recorded in the rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeBucket {
    /// Absolute order imbalance |buy - sell| over the bucket.
    pub imbalance: f64,
    /// Total volume that closed the bucket (may overshoot the target).
    pub volume: Size,
}

/// VPIN value emitted on each bucket completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VpinResult {
    /// Instrument symbol.
    pub instrument: String,
    /// Sum of bucket imbalances over sum of bucket volumes in the window.
    pub vpin: f64,
    /// Buckets currently in the window.
    pub bucket_count: usize,
    /// Timestamp of the tick that closed the bucket.
    pub ts_ms: Option<TimestampMs>,
}
