//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files.
//! Callbacks and the error reporter are code, not configuration; they are
//! passed as extra options when building the engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::lifecycle::options::{self, EngineOption, DEFAULT_TIMEOUT};
use crate::lifecycle::{ConfigError, Signal};

/// Root configuration for the engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum time to wait for each hook to shut down, in milliseconds.
    pub shutdown_timeout_ms: u64,

    /// Signals to listen for on top of the defaults (interrupt, terminate, quit).
    pub signals: Vec<Signal>,

    /// Ignore the default signals; only `signals` and the parent token trigger shutdown.
    pub disable_signals: bool,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            signals: Vec::new(),
            disable_signals: false,
            observability: ObservabilityConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Translate this configuration into engine options.
    pub fn options(&self) -> Result<Vec<EngineOption>, ConfigError> {
        let timeout = self.shutdown_timeout();
        if timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(timeout));
        }

        let mut opts = vec![options::timeout(timeout)];
        if self.disable_signals {
            opts.push(options::disable_signals());
        }
        opts.extend(self.signals.iter().copied().map(options::add_signal));
        Ok(opts)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
