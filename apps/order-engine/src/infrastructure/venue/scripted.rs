//! Scripted execution venue for tests and local runs.
//!
//! Responses are popped from a queue in order. With an empty queue the venue
//! fills the full requested amount at the request's reference price.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::application::ports::{ExecutionVenuePort, VenueError, VenueOrderRequest};
use crate::domain::order_management::ExecutionFill;
use crate::domain::shared::ProviderOrderId;

/// Venue that replays queued responses.
#[derive(Debug, Default)]
pub struct ScriptedVenue {
    script: Mutex<VecDeque<Result<ExecutionFill, VenueError>>>,
    requests: Mutex<Vec<VenueOrderRequest>>,
    calls: AtomicUsize,
    latency: Option<Duration>,
}

impl ScriptedVenue {
    /// Create a venue that fills every request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queue a response.
    pub fn push(&self, response: Result<ExecutionFill, VenueError>) {
        self.script.lock().push_back(response);
    }

    /// Queue a fill.
    pub fn push_fill(&self, fill: ExecutionFill) {
        self.push(Ok(fill));
    }

    /// Queue an error.
    pub fn push_error(&self, error: VenueError) {
        self.push(Err(error));
    }

    /// Number of `submit_order` calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<VenueOrderRequest> {
        self.requests.lock().clone()
    }

    fn echo_fill(request: &VenueOrderRequest) -> ExecutionFill {
        ExecutionFill {
            provider_order_id: ProviderOrderId::new(format!(
                "sim-{}",
                request.idempotency_key.as_str()
            )),
            executed_amount: request.amount,
            executed_price: request.price.unwrap_or(Decimal::ONE),
            fees: Decimal::ZERO,
            fee_currency: None,
        }
    }
}

#[async_trait]
impl ExecutionVenuePort for ScriptedVenue {
    async fn submit_order(&self, request: &VenueOrderRequest) -> Result<ExecutionFill, VenueError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let scripted = self.script.lock().pop_front();
        scripted.unwrap_or_else(|| Ok(Self::echo_fill(request)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_management::OrderSide;
    use crate::domain::shared::{IdempotencyKey, Symbol};
    use rust_decimal_macros::dec;

    fn request() -> VenueOrderRequest {
        VenueOrderRequest {
            idempotency_key: IdempotencyKey::new("k-1"),
            side: OrderSide::Buy,
            asset_symbol: Symbol::new("BTC"),
            amount: dec!(100),
            currency: "USD".to_string(),
            price: Some(dec!(42000)),
        }
    }

    #[tokio::test]
    async fn replays_script_then_echoes() {
        let venue = ScriptedVenue::new();
        venue.push_error(VenueError::transient("timeout"));

        let first = venue.submit_order(&request()).await;
        let second = venue.submit_order(&request()).await.unwrap();

        assert!(matches!(first, Err(VenueError::Transient { .. })));
        assert_eq!(second.executed_amount, dec!(100));
        assert_eq!(second.executed_price, dec!(42000));
        assert_eq!(second.provider_order_id.as_str(), "sim-k-1");
        assert_eq!(venue.calls(), 2);
        assert_eq!(venue.requests().len(), 2);
    }
}
