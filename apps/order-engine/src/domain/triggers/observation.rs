//! Market price observation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{Symbol, Timestamp};

/// Latest price of an asset as reported by the market data feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Asset symbol.
    pub symbol: Symbol,
    /// Last traded / mid price.
    pub price: Decimal,
    /// When the feed observed the price.
    pub observed_at: Timestamp,
}

impl PriceObservation {
    /// Create an observation.
    #[must_use]
    pub const fn new(symbol: Symbol, price: Decimal, observed_at: Timestamp) -> Self {
        Self {
            symbol,
            price,
            observed_at,
        }
    }

    /// Returns true if the observation is older than `max_age` at `now`.
    #[must_use]
    pub fn is_stale(&self, now: Timestamp, max_age: std::time::Duration) -> bool {
        let age = now.duration_since(self.observed_at);
        chrono::Duration::from_std(max_age).is_ok_and(|max| age > max)
    }
}
