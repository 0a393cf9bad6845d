//! Data ingestion and normalization for the VPIN toxicity system.
//!
//! This crate handles:
//! - Tick message decoding and field validation
//! - Tick-rule volume classification (buy/sell split)

pub mod classifier;
pub mod decoder;

pub use classifier::{classify, ClassificationStats};
pub use decoder::{decode_tick, decode_tick_bytes, parse_timestamp, TickMessage};
