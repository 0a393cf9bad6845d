//! Tick-rule volume classification.
//!
//! Splits each tick's volume into buy- and sell-initiated parts by comparing
//! its close against its open. Unchanged ticks are split evenly.

use vpin_core::{Tick, TradeSide, VolumeSplit};

/// Classify a tick's volume with the tick rule.
pub fn classify(tick: &Tick) -> VolumeSplit {
    let side = TradeSide::from_prices(tick.open, tick.close);
    let volume = tick.volume;

    let (buy_volume, sell_volume) = match side {
        TradeSide::Buy => (volume, 0.0),
        TradeSide::Sell => (0.0, volume),
        TradeSide::Neutral => (volume / 2.0, volume / 2.0),
    };

    VolumeSplit {
        side,
        buy_volume,
        sell_volume,
    }
}

/// Statistics about tick classification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationStats {
    /// Total ticks classified.
    pub total_ticks: u64,
    /// Ticks classified as buy.
    pub buy_ticks: u64,
    /// Ticks classified as sell.
    pub sell_ticks: u64,
    /// Ticks with unchanged price.
    pub neutral_ticks: u64,
    /// Total volume processed.
    pub total_volume: f64,
    /// Buy volume.
    pub buy_volume: f64,
    /// Sell volume.
    pub sell_volume: f64,
}

impl ClassificationStats {
    /// Record a classified tick.
    pub fn record(&mut self, split: &VolumeSplit) {
        self.total_ticks += 1;
        self.total_volume += split.total();
        self.buy_volume += split.buy_volume;
        self.sell_volume += split.sell_volume;

        match split.side {
            TradeSide::Buy => self.buy_ticks += 1,
            TradeSide::Sell => self.sell_ticks += 1,
            TradeSide::Neutral => self.neutral_ticks += 1,
        }
    }

    /// Fraction of ticks with unchanged price.
    pub fn neutral_frac(&self) -> f64 {
        if self.total_ticks > 0 {
            self.neutral_ticks as f64 / self.total_ticks as f64
        } else {
            0.0
        }
    }

    /// Net buy volume as a fraction of total volume.
    pub fn net_flow_norm(&self) -> f64 {
        if self.total_volume > 0.0 {
            (self.buy_volume - self.sell_volume) / self.total_volume
        } else {
            0.0
        }
    }

    /// Reset statistics.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
