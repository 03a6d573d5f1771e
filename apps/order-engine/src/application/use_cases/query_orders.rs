//! Query Orders Use Case

use std::sync::Arc;

use crate::domain::order_management::{
    Order, OrderError, OrderExecution, OrderLedger, OrderStatus,
};
use crate::domain::shared::{OrderId, UserId};

/// Read-side queries over the order ledger.
pub struct QueryOrdersUseCase<L>
where
    L: OrderLedger,
{
    ledger: Arc<L>,
}

impl<L> QueryOrdersUseCase<L>
where
    L: OrderLedger,
{
    /// Create a new `QueryOrdersUseCase`.
    pub const fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    /// One order by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the order does not exist.
    pub async fn get(&self, order_id: &OrderId) -> Result<Order, OrderError> {
        self.ledger
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound {
                order_id: order_id.to_string(),
            })
    }

    /// Orders of a user with their current status, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    pub async fn list(
        &self,
        user_id: &UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, OrderError> {
        self.ledger.list_for_user(user_id, status).await
    }

    /// Execution history of an order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the order does not exist.
    pub async fn executions(&self, order_id: &OrderId) -> Result<Vec<OrderExecution>, OrderError> {
        self.get(order_id).await?;
        self.ledger.executions_for(order_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_management::{OrderSide, SubmitOrderCommand};
    use crate::domain::shared::{IdempotencyKey, Symbol, Timestamp};
    use crate::infrastructure::persistence::InMemoryOrderLedger;
    use rust_decimal_macros::dec;

    async fn seed(ledger: &InMemoryOrderLedger, user: &str, key: &str, at: &str) -> Order {
        let command = SubmitOrderCommand::market(
            UserId::new(user),
            IdempotencyKey::new(key),
            OrderSide::Buy,
            Symbol::new("BTC"),
            dec!(10),
        );
        ledger
            .submit(Order::new(command, Timestamp::parse(at).unwrap()).unwrap())
            .await
            .unwrap()
            .order
    }

    #[tokio::test]
    async fn list_is_scoped_to_user_and_newest_first() {
        let ledger = Arc::new(InMemoryOrderLedger::new());
        let older = seed(&ledger, "u-1", "a", "2026-01-19T10:00:00Z").await;
        let newer = seed(&ledger, "u-1", "b", "2026-01-19T11:00:00Z").await;
        seed(&ledger, "u-2", "c", "2026-01-19T12:00:00Z").await;
        let use_case = QueryOrdersUseCase::new(Arc::clone(&ledger));

        let orders = use_case.list(&UserId::new("u-1"), None).await.unwrap();

        let ids: Vec<_> = orders.iter().map(|o| o.id().clone()).collect();
        assert_eq!(ids, vec![newer.id().clone(), older.id().clone()]);
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let ledger = Arc::new(InMemoryOrderLedger::new());
        seed(&ledger, "u-1", "a", "2026-01-19T10:00:00Z").await;
        let use_case = QueryOrdersUseCase::new(Arc::clone(&ledger));

        let pending = use_case
            .list(&UserId::new("u-1"), Some(OrderStatus::PendingTrigger))
            .await
            .unwrap();
        let completed = use_case
            .list(&UserId::new("u-1"), Some(OrderStatus::Completed))
            .await
            .unwrap();

        assert_eq!(pending.len(), 1);
        assert!(completed.is_empty());
    }

    #[tokio::test]
    async fn executions_of_unknown_order_is_not_found() {
        let use_case = QueryOrdersUseCase::new(Arc::new(InMemoryOrderLedger::new()));

        let err = use_case.executions(&OrderId::new("nope")).await.unwrap_err();

        assert!(matches!(err, OrderError::NotFound { .. }));
    }
}
