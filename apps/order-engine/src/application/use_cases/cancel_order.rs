//! Cancel Order Use Case

use std::sync::Arc;

use crate::domain::order_management::{Order, OrderError, OrderLedger, Transition};
use crate::domain::shared::{OrderId, Timestamp, UserId};

/// Upper bound on re-reads after losing a status race.
const MAX_CAS_ROUNDS: usize = 8;

/// Use case for cancelling an order before dispatch.
///
/// Honored only while the order is `pending_trigger` or `triggered`. A cancel
/// racing an in-flight dispatch is rejected with `CannotCancel`.
pub struct CancelOrderUseCase<L>
where
    L: OrderLedger,
{
    ledger: Arc<L>,
}

impl<L> CancelOrderUseCase<L>
where
    L: OrderLedger,
{
    /// Create a new `CancelOrderUseCase`.
    pub const fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    /// Cancel an order owned by `user_id` now.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the order does not exist.
    /// - `NotOwner` if it belongs to another user.
    /// - `CannotCancel` if it is submitting or terminal.
    pub async fn execute(&self, order_id: &OrderId, user_id: &UserId) -> Result<Order, OrderError> {
        self.execute_at(order_id, user_id, Timestamp::now()).await
    }

    /// Cancel an order with an explicit clock.
    ///
    /// # Errors
    ///
    /// Same as [`Self::execute`].
    pub async fn execute_at(
        &self,
        order_id: &OrderId,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<Order, OrderError> {
        let mut last_error = None;

        for _ in 0..MAX_CAS_ROUNDS {
            let order = self
                .ledger
                .find_by_id(order_id)
                .await?
                .ok_or_else(|| OrderError::NotFound {
                    order_id: order_id.to_string(),
                })?;

            if order.user_id() != user_id {
                return Err(OrderError::NotOwner {
                    order_id: order_id.to_string(),
                });
            }

            if !order.status().is_cancelable() {
                return Err(OrderError::CannotCancel {
                    status: order.status(),
                });
            }

            match self
                .ledger
                .transition(order_id, Transition::cancel(order.status()), now)
                .await
            {
                Ok(cancelled) => {
                    tracing::info!(
                        order_id = %order_id,
                        from = %order.status(),
                        "Order cancelled"
                    );
                    return Ok(cancelled);
                }
                Err(e) if e.is_stale() => {
                    tracing::debug!(order_id = %order_id, error = %e, "Cancel lost status race, re-reading");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| OrderError::Storage("cancel did not converge".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_management::{
        OrderSide, OrderStatus, SubmitOrderCommand, TriggerReason,
    };
    use crate::domain::shared::{IdempotencyKey, Symbol, Timestamp};
    use crate::infrastructure::persistence::InMemoryOrderLedger;
    use rust_decimal_macros::dec;

    async fn stored_order(ledger: &InMemoryOrderLedger) -> Order {
        let command = SubmitOrderCommand::market(
            UserId::new("u-1"),
            IdempotencyKey::new("k-1"),
            OrderSide::Sell,
            Symbol::new("ETH"),
            dec!(10),
        );
        ledger
            .submit(Order::new(command, Timestamp::now()).unwrap())
            .await
            .unwrap()
            .order
    }

    #[tokio::test]
    async fn cancels_pending_order() {
        let ledger = Arc::new(InMemoryOrderLedger::new());
        let order = stored_order(&ledger).await;
        let use_case = CancelOrderUseCase::new(Arc::clone(&ledger));

        let cancelled = use_case.execute(order.id(), &UserId::new("u-1")).await.unwrap();

        assert_eq!(cancelled.status(), OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancel_is_stamped_with_the_given_clock() {
        let ledger = Arc::new(InMemoryOrderLedger::new());
        let order = stored_order(&ledger).await;
        let use_case = CancelOrderUseCase::new(Arc::clone(&ledger));
        let at = Timestamp::parse("2024-03-01T09:30:00Z").unwrap();

        let cancelled = use_case
            .execute_at(order.id(), &UserId::new("u-1"), at)
            .await
            .unwrap();

        assert_eq!(cancelled.updated_at(), at);
    }

    #[tokio::test]
    async fn cancels_triggered_order() {
        let ledger = Arc::new(InMemoryOrderLedger::new());
        let order = stored_order(&ledger).await;
        ledger
            .transition(order.id(), Transition::trigger(TriggerReason::Market), Timestamp::now())
            .await
            .unwrap();
        let use_case = CancelOrderUseCase::new(Arc::clone(&ledger));

        let cancelled = use_case.execute(order.id(), &UserId::new("u-1")).await.unwrap();

        assert_eq!(cancelled.status(), OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn rejects_cancel_while_submitting() {
        let ledger = Arc::new(InMemoryOrderLedger::new());
        let order = stored_order(&ledger).await;
        ledger
            .transition(order.id(), Transition::trigger(TriggerReason::Market), Timestamp::now())
            .await
            .unwrap();
        ledger
            .transition(order.id(), Transition::begin_dispatch(), Timestamp::now())
            .await
            .unwrap();
        let use_case = CancelOrderUseCase::new(Arc::clone(&ledger));

        let err = use_case
            .execute(order.id(), &UserId::new("u-1"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            OrderError::CannotCancel {
                status: OrderStatus::Submitting
            }
        );
    }

    #[tokio::test]
    async fn rejects_other_users() {
        let ledger = Arc::new(InMemoryOrderLedger::new());
        let order = stored_order(&ledger).await;
        let use_case = CancelOrderUseCase::new(Arc::clone(&ledger));

        let err = use_case
            .execute(order.id(), &UserId::new("u-2"))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::NotOwner { .. }));
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let ledger = Arc::new(InMemoryOrderLedger::new());
        let use_case = CancelOrderUseCase::new(ledger);

        let err = use_case
            .execute(&OrderId::new("missing"), &UserId::new("u-1"))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::NotFound { .. }));
    }
}
