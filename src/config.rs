//! Server configuration.
//!
//! Defaults live here; `main.rs` overrides them from command-line flags.

use crate::connection::{SessionConfig, DEFAULT_OUTPUT_HIGH_WATER};
use crate::protocol::DecoderLimits;
use crate::storage::ExpiryConfig;
use std::time::Duration;

/// Main configuration for an EmberKV server
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network
    // -------------------------------------------------------------------------
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    // -------------------------------------------------------------------------
    // Protocol
    // -------------------------------------------------------------------------
    /// Size limits enforced while decoding requests
    pub limits: DecoderLimits,

    /// Outbound bytes per connection above which reading pauses
    pub output_high_water: usize,

    // -------------------------------------------------------------------------
    // Expiry
    // -------------------------------------------------------------------------
    /// Background sweeper settings
    pub expiry: ExpiryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: crate::DEFAULT_HOST.to_string(),
            port: crate::DEFAULT_PORT,
            limits: DecoderLimits::default(),
            output_high_water: DEFAULT_OUTPUT_HIGH_WATER,
            expiry: ExpiryConfig::default(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Per-connection settings derived from this config.
    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            limits: self.limits,
            output_high_water: self.output_high_water,
        }
    }
}

/// Builder for Config
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the host to bind to
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the port (0 picks a free port)
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the largest accepted bulk string (in bytes)
    pub fn max_bulk_len(mut self, len: usize) -> Self {
        self.config.limits.max_bulk_len = len;
        self
    }

    /// Set the largest accepted command array
    pub fn max_array_len(mut self, len: usize) -> Self {
        self.config.limits.max_array_len = len;
        self
    }

    /// Set the longest accepted inline command (in bytes)
    pub fn max_inline_len(mut self, len: usize) -> Self {
        self.config.limits.max_inline_len = len;
        self
    }

    /// Set the outbound high-water mark (in bytes)
    pub fn output_high_water(mut self, bytes: usize) -> Self {
        self.config.output_high_water = bytes;
        self
    }

    /// Set the base sweeper interval
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.expiry.base_interval = interval;
        self.config.expiry.min_interval = self.config.expiry.min_interval.min(interval);
        self.config.expiry.max_interval = self.config.expiry.max_interval.max(interval);
        self
    }

    /// Set how many expired keys the sweeper removes per shard per cycle
    pub fn sweep_batch(mut self, batch: usize) -> Self {
        self.config.expiry.batch_size = batch.max(1);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
