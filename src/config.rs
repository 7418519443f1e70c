//! Process configuration: optional TOML file, then environment overrides.
//!
//! ```toml
//! listen_addr = "0.0.0.0:3000"
//!
//! [metrics]
//! url       = "https://otlp-gateway.example.net/otlp/v1/metrics"
//! api_key   = "123456:glc_..."
//! period_ms = 10000
//! source    = "jwt-pizza-service"
//! ```

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

pub const ENV_URL: &str = "METRICS_URL";
pub const ENV_API_KEY: &str = "METRICS_API_KEY";
pub const ENV_PERIOD_MS: &str = "METRICS_PERIOD_MS";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    pub metrics: MetricsConfig,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Collector push endpoint. Empty disables the exporter.
    pub url: String,
    /// Sent as `Authorization: Bearer <api_key>`.
    pub api_key: String,
    pub period_ms: u64,
    /// Per-push request timeout.
    pub timeout_ms: u64,
    /// Exported as the `service.name` resource attribute.
    pub source: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".into(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            period_ms: 10_000,
            timeout_ms: 5_000,
            source: None,
        }
    }
}

impl fmt::Debug for MetricsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsConfig")
            .field("url", &self.url)
            .field("api_key", &"[REDACTED]")
            .field("period_ms", &self.period_ms)
            .field("timeout_ms", &self.timeout_ms)
            .field("source", &self.source)
            .finish()
    }
}

impl MetricsConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn export_enabled(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

impl Config {
    /// Load from `path` if given, then apply the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply the recognized overrides from `lookup` (the environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_URL) {
            self.metrics.url = url;
        }
        if let Some(key) = lookup(ENV_API_KEY) {
            self.metrics.api_key = key;
        }
        if let Some(raw) = lookup(ENV_PERIOD_MS) {
            self.metrics.period_ms = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: ENV_PERIOD_MS,
                value: raw.clone(),
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metrics.period_ms == 0 {
            return Err(ConfigError::InvalidPeriod);
        }
        if self.metrics.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(())
    }
}
