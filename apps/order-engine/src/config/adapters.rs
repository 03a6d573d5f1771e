//! External collaborator endpoints: execution venue and market data feed.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Execution venue endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueConfig {
    /// Base URL; orders are posted to `{base_url}/orders`.
    #[serde(default = "default_venue_url")]
    pub base_url: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Bearer token, if the venue requires one.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl VenueConfig {
    /// Timeout as a `Duration`.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            base_url: default_venue_url(),
            timeout_ms: default_timeout_ms(),
            api_key: None,
        }
    }
}

/// Market data feed endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketDataConfig {
    /// Base URL; prices are read from `{base_url}/prices/{symbol}`.
    #[serde(default = "default_market_data_url")]
    pub base_url: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl MarketDataConfig {
    /// Timeout as a `Duration`.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            base_url: default_market_data_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_venue_url() -> String {
    "http://localhost:9001".to_string()
}

fn default_market_data_url() -> String {
    "http://localhost:9002".to_string()
}

const fn default_timeout_ms() -> u64 {
    5_000
}
