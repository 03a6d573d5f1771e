//! Worker pool configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::services::EngineSettings;

/// Evaluator/dispatcher worker pool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of concurrent workers.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Orders pulled per evaluation or dispatch page.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Delay between cycles of one worker, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Prices older than this are treated as missing, in seconds.
    #[serde(default = "default_max_price_age_secs")]
    pub max_price_age_secs: u64,
}

impl EngineConfig {
    /// Poll interval as a `Duration`.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Maximum price age as a `Duration`.
    #[must_use]
    pub const fn max_price_age(&self) -> Duration {
        Duration::from_secs(self.max_price_age_secs)
    }

    /// Worker pool settings.
    #[must_use]
    pub const fn to_settings(&self) -> EngineSettings {
        EngineSettings {
            workers: self.workers,
            batch_size: self.batch_size,
            poll_interval: self.poll_interval(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            batch_size: default_batch_size(),
            poll_interval_ms: default_poll_interval_ms(),
            max_price_age_secs: default_max_price_age_secs(),
        }
    }
}

const fn default_workers() -> usize {
    4
}

const fn default_batch_size() -> usize {
    100
}

const fn default_poll_interval_ms() -> u64 {
    1_000
}

const fn default_max_price_age_secs() -> u64 {
    30
}
