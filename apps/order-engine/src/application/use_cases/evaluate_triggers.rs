//! Evaluate Triggers Use Case
//!
//! Pulls one page of pending orders, reads the current price once per asset,
//! persists trailing-stop watermarks and moves firing orders to `triggered`.
//! A missing or stale price defers the order to the next cycle; a lost status
//! race is skipped silently.

use std::collections::HashMap;
use std::sync::Arc;

use crate::application::ports::MarketDataPort;
use crate::domain::order_management::{
    Order, OrderError, OrderLedger, PendingQuery, ScanKey, Transition,
};
use crate::domain::shared::{Symbol, Timestamp};
use crate::domain::triggers::{PriceObservation, TriggerEvaluator, Verdict};
use crate::observability::{record_evaluation_deferred, record_trigger_fired};

/// Counters for one evaluation page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationReport {
    /// Orders examined.
    pub scanned: usize,
    /// Orders moved to `triggered`.
    pub fired: usize,
    /// Orders whose condition was not met.
    pub held: usize,
    /// Orders deferred for lack of a fresh price.
    pub deferred: usize,
    /// Trigger transitions lost to a concurrent writer.
    pub conflicts: usize,
    /// Trailing-stop watermarks raised.
    pub watermarks_raised: usize,
    /// Cursor of the next page, `None` once the scan wrapped.
    pub next_cursor: Option<ScanKey>,
}

/// Use case for evaluating pending orders against market data.
pub struct EvaluateTriggersUseCase<L, M>
where
    L: OrderLedger,
    M: MarketDataPort,
{
    ledger: Arc<L>,
    market_data: Arc<M>,
    evaluator: TriggerEvaluator,
}

impl<L, M> EvaluateTriggersUseCase<L, M>
where
    L: OrderLedger,
    M: MarketDataPort,
{
    /// Create a new `EvaluateTriggersUseCase`.
    pub const fn new(ledger: Arc<L>, market_data: Arc<M>, evaluator: TriggerEvaluator) -> Self {
        Self {
            ledger,
            market_data,
            evaluator,
        }
    }

    /// Evaluate one page of the pending scan.
    ///
    /// # Errors
    ///
    /// Returns error only if the page itself cannot be read. Per-order
    /// failures are logged and counted.
    pub async fn execute(
        &self,
        query: PendingQuery,
        now: Timestamp,
    ) -> Result<EvaluationReport, OrderError> {
        let page = self.ledger.list_pending(query).await?;
        let prices = self.read_prices(&page.orders).await;

        let mut report = EvaluationReport {
            scanned: page.orders.len(),
            next_cursor: page.next,
            ..EvaluationReport::default()
        };

        for order in &page.orders {
            self.evaluate_one(order, prices.get(order.asset_symbol()), now, &mut report)
                .await;
        }

        if report.fired > 0 || report.deferred > 0 {
            tracing::debug!(
                scanned = report.scanned,
                fired = report.fired,
                deferred = report.deferred,
                conflicts = report.conflicts,
                "Evaluation page processed"
            );
        }

        Ok(report)
    }

    async fn evaluate_one(
        &self,
        order: &Order,
        observation: Option<&PriceObservation>,
        now: Timestamp,
        report: &mut EvaluationReport,
    ) {
        let decision = self.evaluator.evaluate(order, observation, now);

        if let Some(watermark) = decision.raise_watermark_to {
            match self.ledger.raise_watermark(order.id(), watermark, now).await {
                Ok(_) => {
                    report.watermarks_raised += 1;
                    tracing::debug!(
                        order_id = %order.id(),
                        highest_price = %watermark,
                        "Trailing watermark raised"
                    );
                }
                Err(e) => {
                    tracing::warn!(order_id = %order.id(), error = %e, "Failed to raise watermark");
                }
            }
        }

        match decision.verdict {
            Verdict::Fire(reason) => {
                let label = reason.label();
                match self
                    .ledger
                    .transition(order.id(), Transition::trigger(reason), now)
                    .await
                {
                    Ok(triggered) => {
                        report.fired += 1;
                        record_trigger_fired(label);
                        tracing::info!(
                            order_id = %triggered.id(),
                            asset = %triggered.asset_symbol(),
                            reason = label,
                            status = %triggered.status(),
                            "Order triggered"
                        );
                    }
                    Err(e) if e.is_stale() => {
                        report.conflicts += 1;
                        tracing::debug!(order_id = %order.id(), error = %e, "Trigger lost status race");
                    }
                    Err(e) => {
                        tracing::warn!(order_id = %order.id(), error = %e, "Trigger transition failed");
                    }
                }
            }
            Verdict::Hold => report.held += 1,
            Verdict::Defer(reason) => {
                report.deferred += 1;
                record_evaluation_deferred(reason.label());
                tracing::debug!(
                    order_id = %order.id(),
                    asset = %order.asset_symbol(),
                    reason = reason.label(),
                    "Evaluation deferred"
                );
            }
        }
    }

    /// One price read per distinct asset that needs one.
    async fn read_prices(&self, orders: &[Order]) -> HashMap<Symbol, PriceObservation> {
        let mut symbols: Vec<&Symbol> = orders
            .iter()
            .filter(|o| o.recurrence().is_none() && o.condition().needs_price())
            .map(Order::asset_symbol)
            .collect();
        symbols.sort();
        symbols.dedup();

        let mut prices = HashMap::with_capacity(symbols.len());
        for symbol in symbols {
            match self.market_data.latest_price(symbol).await {
                Ok(observation) => {
                    prices.insert(symbol.clone(), observation);
                }
                Err(e) => {
                    tracing::debug!(asset = %symbol, error = %e, "Price unavailable");
                }
            }
        }
        prices
    }
}
