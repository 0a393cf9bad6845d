//! Configuration structures for the VPIN toxicity system.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Environment variable overriding `vpin.bucket_volume`.
pub const ENV_BUCKET_VOLUME: &str = "VPIN_BUCKET_VOLUME";
/// Environment variable overriding `vpin.window_size`.
pub const ENV_WINDOW_SIZE: &str = "VPIN_WINDOW_SIZE";
/// Environment variable overriding `service.workers`.
pub const ENV_WORKERS: &str = "VPIN_WORKERS";

/// Main configuration for the system.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// VPIN engine configuration.
    pub vpin: VpinConfig,
    /// Listener service configuration.
    pub service: ServiceConfig,
}

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// Missing sections and fields fall back to their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_BUCKET_VOLUME) {
            self.vpin.bucket_volume = parse_override(ENV_BUCKET_VOLUME, &v)?;
        }
        if let Some(v) = lookup(ENV_WINDOW_SIZE) {
            self.vpin.window_size = parse_override(ENV_WINDOW_SIZE, &v)?;
        }
        if let Some(v) = lookup(ENV_WORKERS) {
            self.service.workers = parse_override(ENV_WORKERS, &v)?;
        }
        self.validate()
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.vpin.validate()?;
        self.service.validate()
    }
}

fn parse_override<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("{key}: cannot parse {value:?}")))
}

/// VPIN engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VpinConfig {
    /// Volume a bucket must exceed to complete.
    pub bucket_volume: f64,
    /// Number of completed buckets in the rolling window.
    pub window_size: usize,
}

impl Default for VpinConfig {
    fn default() -> Self {
        Self {
            bucket_volume: 100_000.0,
            window_size: 50,
        }
    }
}

impl VpinConfig {
    /// Create a validated VPIN configuration.
    pub fn new(bucket_volume: f64, window_size: usize) -> Result<Self> {
        let config = Self {
            bucket_volume,
            window_size,
        };
        config.validate()?;
        Ok(config)
    }

    /// Both tunables must be strictly positive.
    pub fn validate(&self) -> Result<()> {
        if !self.bucket_volume.is_finite() || self.bucket_volume <= 0.0 {
            return Err(Error::config(format!(
                "bucket_volume must be positive, got {}",
                self.bucket_volume
            )));
        }
        if self.window_size == 0 {
            return Err(Error::config("window_size must be greater than 0"));
        }
        Ok(())
    }
}

/// Listener service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Number of worker tasks processing ticks.
    pub workers: usize,
    /// Capacity of each worker's queue.
    pub channel_capacity: usize,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            channel_capacity: 1024,
            log_filter: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Worker count and queue capacity must be positive.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::config("workers must be greater than 0"));
        }
        if self.channel_capacity == 0 {
            return Err(Error::config("channel_capacity must be greater than 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.vpin.bucket_volume, 100_000.0);
        assert_eq!(config.vpin.window_size, 50);
        assert_eq!(config.service.workers, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_tunables() {
        assert!(VpinConfig::new(0.0, 50).is_err());
        assert!(VpinConfig::new(-5.0, 50).is_err());
        assert!(VpinConfig::new(f64::NAN, 50).is_err());
        assert!(VpinConfig::new(100.0, 0).is_err());
        assert!(VpinConfig::new(100.0, 2).is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config: Config = serde_json::from_str(r#"{"vpin": {"window_size": 10}}"#).unwrap();
        assert_eq!(config.vpin.window_size, 10);
        assert_eq!(config.vpin.bucket_volume, 100_000.0);
        assert_eq!(config.service.channel_capacity, 1024);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> =
            [(ENV_BUCKET_VOLUME, "250"), (ENV_WORKERS, " 8 ")].into_iter().collect();
        let mut config = Config::default();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.vpin.bucket_volume, 250.0);
        assert_eq!(config.vpin.window_size, 50);
        assert_eq!(config.service.workers, 8);
    }

    #[test]
    fn test_bad_override() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(|k| (k == ENV_WINDOW_SIZE).then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let mut config = Config::default();
        assert!(config
            .apply_overrides(|k| (k == ENV_WINDOW_SIZE).then(|| "0".to_string()))
            .is_err());
    }
}
