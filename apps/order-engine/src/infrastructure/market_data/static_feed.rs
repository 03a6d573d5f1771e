//! In-process price feed.
//!
//! Prices are set explicitly; nothing ages them, so staleness is whatever
//! timestamp the caller supplied.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::application::ports::{MarketDataError, MarketDataPort};
use crate::domain::shared::{Symbol, Timestamp};
use crate::domain::triggers::PriceObservation;

/// Price feed backed by a map of symbol to last observation.
#[derive(Debug, Default)]
pub struct StaticPriceFeed {
    prices: RwLock<HashMap<Symbol, PriceObservation>>,
    reads: AtomicUsize,
}

impl StaticPriceFeed {
    /// Create an empty feed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the price for a symbol, observed at `observed_at`.
    pub fn set_price(&self, symbol: &str, price: Decimal, observed_at: Timestamp) {
        let symbol = Symbol::new(symbol);
        self.prices.write().insert(
            symbol.clone(),
            PriceObservation::new(symbol, price, observed_at),
        );
    }

    /// Forget the price for a symbol.
    pub fn remove(&self, symbol: &str) {
        self.prices.write().remove(&Symbol::new(symbol));
    }

    /// Number of `latest_price` calls so far.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataPort for StaticPriceFeed {
    async fn latest_price(&self, symbol: &Symbol) -> Result<PriceObservation, MarketDataError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.prices
            .read()
            .get(symbol)
            .cloned()
            .ok_or_else(|| MarketDataError::Unavailable {
                symbol: symbol.to_string(),
            })
    }
}
