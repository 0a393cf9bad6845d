//! Core types and configuration for the VPIN toxicity system.
//!
//! This crate provides shared types used across all other crates:
//! - Tick and VPIN result types
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, ServiceConfig, VpinConfig};
pub use error::{Error, Result};
pub use types::*;
