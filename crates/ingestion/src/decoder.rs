//! Wire message decoding and validation.
//!
//! Tick messages arrive as JSON objects:
//!
//! ```text
//! {"event_type": "TICK", "timestamp": "2024-01-02 14:30:00+00:00",
//!  "ticker": "SPY", "open": 470.1, "high": 470.4, "low": 469.9,
//!  "close": 470.3, "volume": 182311}
//! ```
//!
//! Volume is a whole share count, written either as an integer or as a
//! whole-number float such as `182311.0`.
//!
//! Syntax and type errors surface as [`Error::Json`]. Messages that parse but
//! break a field constraint surface as [`Error::Validation`] and are meant to
//! be dropped rather than redelivered.

use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use tracing::debug;
use vpin_core::{Error, Result, Tick, TimestampMs};

/// Event type carried by trade tick messages.
pub const TICK_EVENT_TYPE: &str = "TICK";

/// Raw tick message as published upstream.
///
/// Every field is optional here so that absent and null fields are reported
/// as validation failures, not decode failures.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TickMessage {
    pub event_type: Option<String>,
    pub timestamp: Option<String>,
    pub ticker: Option<String>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

impl TickMessage {
    /// Check field constraints and build a [`Tick`].
    pub fn validate(self) -> Result<Tick> {
        let mut violations = Vec::new();

        let event_type = not_blank("event_type", self.event_type, &mut violations);
        let timestamp = not_blank("timestamp", self.timestamp, &mut violations);
        let ticker = not_blank("ticker", self.ticker, &mut violations);
        let open = finite("open", self.open, &mut violations);
        let high = finite("high", self.high, &mut violations);
        let low = finite("low", self.low, &mut violations);
        let close = finite("close", self.close, &mut violations);

        let volume = match self.volume {
            None => {
                violations.push("volume: must not be null".to_string());
                None
            }
            Some(v) if !v.is_finite() || v.fract() != 0.0 => {
                violations.push(format!("volume: must be a whole number, got {v}"));
                None
            }
            Some(v) if v < 0.0 => {
                violations.push(format!("volume: must be greater than or equal to 0, got {v}"));
                None
            }
            Some(v) => Some(v),
        };

        if let Some(kind) = &event_type {
            if kind != TICK_EVENT_TYPE {
                violations.push(format!("event_type: expected {TICK_EVENT_TYPE}, got {kind}"));
            }
        }

        match (timestamp, ticker, open, high, low, close, volume) {
            (Some(timestamp), Some(ticker), Some(open), Some(high), Some(low), Some(close), Some(volume))
                if violations.is_empty() =>
            {
                let ts_ms = parse_timestamp(&timestamp);
                if ts_ms.is_none() {
                    debug!(ticker = %ticker, timestamp = %timestamp, "unparseable tick timestamp");
                }
                Ok(Tick {
                    instrument: ticker,
                    ts_ms,
                    open,
                    high,
                    low,
                    close,
                    volume,
                })
            }
            _ => Err(Error::validation(violations.join("; "))),
        }
    }
}

fn not_blank(field: &str, value: Option<String>, violations: &mut Vec<String>) -> Option<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Some(v),
        _ => {
            violations.push(format!("{field}: must not be blank"));
            None
        }
    }
}

fn finite(field: &str, value: Option<f64>, violations: &mut Vec<String>) -> Option<f64> {
    match value {
        Some(v) if v.is_finite() => Some(v),
        Some(v) => {
            violations.push(format!("{field}: must be finite, got {v}"));
            None
        }
        None => {
            violations.push(format!("{field}: must not be null"));
            None
        }
    }
}

/// Decode and validate a tick message.
pub fn decode_tick(raw: &str) -> Result<Tick> {
    let message: TickMessage = serde_json::from_str(raw)?;
    message.validate()
}

/// Decode and validate a tick message from bytes.
pub fn decode_tick_bytes(raw: &[u8]) -> Result<Tick> {
    let message: TickMessage = serde_json::from_slice(raw)?;
    message.validate()
}

/// Parse an upstream timestamp into milliseconds since epoch.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS+HH:MM` (with optional fractional
/// seconds) and naive `YYYY-MM-DD HH:MM:SS`, which is taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<TimestampMs> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.timestamp_millis());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc().timestamp_millis())
}
