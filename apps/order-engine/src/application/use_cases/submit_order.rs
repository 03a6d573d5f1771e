//! Submit Order Use Case

use std::sync::Arc;

use crate::domain::order_management::{
    Order, OrderError, OrderLedger, SubmitOrderCommand, SubmitOutcome,
};
use crate::domain::shared::Timestamp;
use crate::observability::record_order_submitted;

/// Use case for accepting a new trading instruction.
///
/// Validation errors are synchronous and nothing is stored. A repeated
/// `(user_id, idempotency_key)` returns the stored order unchanged.
pub struct SubmitOrderUseCase<L>
where
    L: OrderLedger,
{
    ledger: Arc<L>,
}

impl<L> SubmitOrderUseCase<L>
where
    L: OrderLedger,
{
    /// Create a new `SubmitOrderUseCase`.
    pub const fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    /// Submit an order now.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOrder` on validation failure, or a storage error.
    pub async fn execute(&self, command: SubmitOrderCommand) -> Result<SubmitOutcome, OrderError> {
        self.execute_at(command, Timestamp::now()).await
    }

    /// Submit an order with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOrder` on validation failure, or a storage error.
    pub async fn execute_at(
        &self,
        command: SubmitOrderCommand,
        now: Timestamp,
    ) -> Result<SubmitOutcome, OrderError> {
        let order = match Order::new(command, now) {
            Ok(order) => order,
            Err(e) => {
                tracing::debug!(error = %e, "Order rejected at submission");
                return Err(e);
            }
        };

        let outcome = self.ledger.submit(order).await?;
        record_order_submitted(outcome.order.advanced_type().as_str(), outcome.created);

        if outcome.created {
            tracing::info!(
                order_id = %outcome.order.id(),
                user_id = %outcome.order.user_id(),
                asset = %outcome.order.asset_symbol(),
                side = %outcome.order.side(),
                amount = %outcome.order.amount(),
                condition = %outcome.order.condition(),
                "Order accepted"
            );
        } else {
            tracing::info!(
                order_id = %outcome.order.id(),
                idempotency_key = %outcome.order.idempotency_key(),
                "Duplicate submission returned existing order"
            );
        }

        Ok(outcome)
    }
}
