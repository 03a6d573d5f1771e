//! Shared wiring for integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use order_engine::application::services::{
    EngineSettings, OrderEngine, RetryController, RetryPolicy,
};
use order_engine::application::use_cases::{
    DispatchOrderUseCase, EvaluateTriggersUseCase, SubmitOrderUseCase,
};
use order_engine::domain::order_management::{Order, OrderSide, SubmitOrderCommand};
use order_engine::domain::shared::{IdempotencyKey, Symbol, Timestamp, UserId};
use order_engine::domain::triggers::TriggerEvaluator;
use order_engine::infrastructure::market_data::StaticPriceFeed;
use order_engine::infrastructure::persistence::{InMemoryOrderLedger, InMemoryQuotaLedger};
use order_engine::infrastructure::venue::ScriptedVenue;
use rust_decimal::Decimal;

pub type TestEngine =
    OrderEngine<InMemoryOrderLedger, InMemoryQuotaLedger, ScriptedVenue, StaticPriceFeed>;

/// Ledgers, adapters and an engine wired together in-process.
pub struct Stack {
    pub ledger: Arc<InMemoryOrderLedger>,
    pub quota: Arc<InMemoryQuotaLedger>,
    pub venue: Arc<ScriptedVenue>,
    pub feed: Arc<StaticPriceFeed>,
    pub engine: Arc<TestEngine>,
}

impl Stack {
    pub fn new() -> Self {
        Self::with_venue(ScriptedVenue::new(), 1)
    }

    pub fn with_venue(venue: ScriptedVenue, workers: usize) -> Self {
        let ledger = Arc::new(InMemoryOrderLedger::new());
        let quota = Arc::new(InMemoryQuotaLedger::new());
        let venue = Arc::new(venue);
        let feed = Arc::new(StaticPriceFeed::new());

        let engine = OrderEngine::new(
            EvaluateTriggersUseCase::new(
                Arc::clone(&ledger),
                Arc::clone(&feed),
                TriggerEvaluator::new(Duration::from_secs(30)),
            ),
            dispatcher(&ledger, &quota, &venue),
            EngineSettings {
                workers,
                batch_size: 50,
                poll_interval: Duration::from_millis(5),
            },
        );

        Self {
            ledger,
            quota,
            venue,
            feed,
            engine: Arc::new(engine),
        }
    }

    pub async fn submit(&self, command: SubmitOrderCommand, now: Timestamp) -> Order {
        SubmitOrderUseCase::new(Arc::clone(&self.ledger))
            .execute_at(command, now)
            .await
            .unwrap()
            .order
    }
}

pub fn dispatcher(
    ledger: &Arc<InMemoryOrderLedger>,
    quota: &Arc<InMemoryQuotaLedger>,
    venue: &Arc<ScriptedVenue>,
) -> DispatchOrderUseCase<InMemoryOrderLedger, InMemoryQuotaLedger, ScriptedVenue> {
    DispatchOrderUseCase::new(
        Arc::clone(ledger),
        Arc::clone(quota),
        Arc::clone(venue),
        RetryController::new(RetryPolicy::default().without_jitter()),
    )
}

pub fn at(rfc3339: &str) -> Timestamp {
    Timestamp::parse(rfc3339).unwrap()
}

pub fn market(key: &str, side: OrderSide, symbol: &str, amount: Decimal) -> SubmitOrderCommand {
    SubmitOrderCommand::market(
        UserId::new("u-1"),
        IdempotencyKey::new(key),
        side,
        Symbol::new(symbol),
        amount,
    )
}
