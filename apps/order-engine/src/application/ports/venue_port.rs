//! Execution Venue Port (Driven Port)
//!
//! Interface to the external venue that actually executes orders. The venue
//! is expected to de-duplicate on the forwarded idempotency key.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_management::{ExecutionFill, Order, OrderSide};
use crate::domain::shared::{IdempotencyKey, Symbol};

/// Request to execute an order at the venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueOrderRequest {
    /// The order's idempotency key, forwarded for venue-side de-duplication.
    pub idempotency_key: IdempotencyKey,
    /// Buy or sell.
    pub side: OrderSide,
    /// Asset to trade.
    pub asset_symbol: Symbol,
    /// Amount to trade.
    pub amount: Decimal,
    /// Quote currency.
    pub currency: String,
    /// Reference price (limit/stop price or triggering observation).
    pub price: Option<Decimal>,
}

impl VenueOrderRequest {
    /// Build the venue request for an order.
    #[must_use]
    pub fn for_order(order: &Order) -> Self {
        let price = order
            .condition()
            .reference_price()
            .or_else(|| order.trigger_reason().and_then(|reason| reason.price()));
        Self {
            idempotency_key: order.idempotency_key().clone(),
            side: order.side(),
            asset_symbol: order.asset_symbol().clone(),
            amount: order.amount(),
            currency: order.currency().to_string(),
            price,
        }
    }
}

/// Venue port error, classified for the retry controller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VenueError {
    /// Network failure, timeout, rate limit or venue 5xx. Safe to retry.
    #[error("Transient venue error: {message}")]
    Transient {
        /// Error details.
        message: String,
    },

    /// Venue rejected the order as invalid. Never retried.
    #[error("Venue rejected order: {message}")]
    Permanent {
        /// Error details.
        message: String,
    },
}

impl VenueError {
    /// Transient error shorthand.
    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Permanent error shorthand.
    #[must_use]
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent {
            message: message.into(),
        }
    }

    /// Returns true if another attempt may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Error text without the classification prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Transient { message } | Self::Permanent { message } => message,
        }
    }
}

/// Execution venue port.
#[async_trait]
pub trait ExecutionVenuePort: Send + Sync {
    /// Execute an order.
    ///
    /// # Errors
    ///
    /// Returns a transient or permanent `VenueError`.
    async fn submit_order(&self, request: &VenueOrderRequest) -> Result<ExecutionFill, VenueError>;
}
