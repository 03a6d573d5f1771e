//! Market Data Port (Driven Port)
//!
//! Interface for reading the latest price of an asset.

use async_trait::async_trait;

use crate::domain::shared::Symbol;
use crate::domain::triggers::PriceObservation;

/// Market data error. Every variant defers evaluation; none fails an order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarketDataError {
    /// The feed has no price for the asset.
    #[error("No price available for {symbol}")]
    Unavailable {
        /// Asset symbol.
        symbol: String,
    },

    /// Connection error or timeout.
    #[error("Market data connection error: {message}")]
    Connection {
        /// Error details.
        message: String,
    },

    /// The feed answered with something unparseable.
    #[error("Invalid market data response: {message}")]
    InvalidResponse {
        /// Error details.
        message: String,
    },
}

/// Market data port.
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// Latest price for an asset.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` if the feed has no price, or a transport error.
    async fn latest_price(&self, symbol: &Symbol) -> Result<PriceObservation, MarketDataError>;
}
