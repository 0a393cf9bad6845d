//! Streaming VPIN service for the toxicity system.
//!
//! This crate handles:
//! - Reading and dispatching tick messages to a worker pool
//! - Publishing VPIN results as JSON lines
//! - Logging setup

pub mod listener;
pub mod logging;
pub mod publisher;

pub use listener::{spawn_line_reader, ListenerStats, ListenerStatsSnapshot, TickListener};
pub use logging::init_logging;
pub use publisher::{run_publisher, ChannelSink};
