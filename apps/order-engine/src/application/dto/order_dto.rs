//! Order DTOs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_management::{
    AdvancedType, ExecutionStatus, FailureReason, Order, OrderExecution, OrderSide, OrderStatus,
    Priority, TriggerCondition, TriggerReason,
};
use crate::domain::recurrence::RecurrenceRule;
use crate::domain::shared::Timestamp;

/// DTO representing an order with its current status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDto {
    /// Order ID.
    pub order_id: String,
    /// Owning user.
    pub user_id: String,
    /// Shared space.
    pub space_id: Option<String>,
    /// Caller-supplied idempotency key.
    pub idempotency_key: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Priority.
    pub priority: Priority,
    /// Amount.
    pub amount: Decimal,
    /// Currency.
    pub currency: String,
    /// Asset symbol.
    pub asset_symbol: String,
    /// Trigger condition.
    pub condition: TriggerCondition,
    /// Derived advanced type.
    pub advanced_type: AdvancedType,
    /// Trailing-stop watermark.
    pub highest_price: Option<Decimal>,
    /// Recurrence rule.
    pub recurrence: Option<RecurrenceRule>,
    /// Occurrence index.
    pub execution_count: u32,
    /// Series bound.
    pub max_executions: Option<u32>,
    /// Next schedule time of a recurring order.
    pub scheduled_for: Option<Timestamp>,
    /// Status.
    pub status: OrderStatus,
    /// Why the order fired.
    pub trigger_reason: Option<TriggerReason>,
    /// Why the order failed.
    pub failure_reason: Option<FailureReason>,
    /// Earliest next dispatch after a transient failure.
    pub retry_not_before: Option<Timestamp>,
    /// Venue order id of the completed attempt.
    pub provider_order_id: Option<String>,
    /// Executed amount.
    pub executed_amount: Option<Decimal>,
    /// Executed price.
    pub executed_price: Option<Decimal>,
    /// Fees.
    pub fees: Option<Decimal>,
    /// Submitted at.
    pub submitted_at: Timestamp,
    /// Triggered at.
    pub triggered_at: Option<Timestamp>,
    /// Executed at.
    pub executed_at: Option<Timestamp>,
    /// Updated at.
    pub updated_at: Timestamp,
}

impl OrderDto {
    /// Create from domain Order.
    #[must_use]
    pub fn from_order(order: &Order) -> Self {
        let outcome = order.outcome();
        Self {
            order_id: order.id().to_string(),
            user_id: order.user_id().to_string(),
            space_id: order.space_id().map(ToString::to_string),
            idempotency_key: order.idempotency_key().to_string(),
            side: order.side(),
            priority: order.priority(),
            amount: order.amount(),
            currency: order.currency().to_string(),
            asset_symbol: order.asset_symbol().to_string(),
            condition: *order.condition(),
            advanced_type: order.advanced_type(),
            highest_price: order.highest_price(),
            recurrence: order.recurrence().copied(),
            execution_count: order.execution_count(),
            max_executions: order.max_executions(),
            scheduled_for: order.scheduled_for(),
            status: order.status(),
            trigger_reason: order.trigger_reason().cloned(),
            failure_reason: order.failure_reason().cloned(),
            retry_not_before: order.retry_not_before(),
            provider_order_id: outcome.map(|f| f.provider_order_id.to_string()),
            executed_amount: outcome.map(|f| f.executed_amount),
            executed_price: outcome.map(|f| f.executed_price),
            fees: outcome.map(|f| f.fees),
            submitted_at: order.submitted_at(),
            triggered_at: order.triggered_at(),
            executed_at: order.executed_at(),
            updated_at: order.updated_at(),
        }
    }
}

/// DTO representing one execution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionDto {
    /// Order ID.
    pub order_id: String,
    /// Attempt number (1-based).
    pub attempt_number: u32,
    /// Attempt status.
    pub status: ExecutionStatus,
    /// Venue order id, when completed.
    pub provider_order_id: Option<String>,
    /// Executed amount.
    pub executed_amount: Option<Decimal>,
    /// Executed price.
    pub executed_price: Option<Decimal>,
    /// Fees.
    pub fees: Option<Decimal>,
    /// Fee currency.
    pub fee_currency: Option<String>,
    /// Venue error text, when failed.
    pub error: Option<String>,
    /// Started at.
    pub started_at: Timestamp,
    /// Finished at.
    pub completed_at: Option<Timestamp>,
}

impl ExecutionDto {
    /// Create from a domain execution attempt.
    #[must_use]
    pub fn from_execution(execution: &OrderExecution) -> Self {
        let fill = execution.fill();
        Self {
            order_id: execution.order_id().to_string(),
            attempt_number: execution.attempt_number(),
            status: execution.status(),
            provider_order_id: fill.map(|f| f.provider_order_id.to_string()),
            executed_amount: fill.map(|f| f.executed_amount),
            executed_price: fill.map(|f| f.executed_price),
            fees: fill.map(|f| f.fees),
            fee_currency: fill.and_then(|f| f.fee_currency.clone()),
            error: execution.error().map(ToString::to_string),
            started_at: execution.started_at(),
            completed_at: execution.completed_at(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_management::SubmitOrderCommand;
    use crate::domain::shared::{IdempotencyKey, Symbol, UserId};
    use rust_decimal_macros::dec;

    #[test]
    fn order_dto_serializes_condition_and_status() {
        let command = SubmitOrderCommand::market(
            UserId::new("u-1"),
            IdempotencyKey::new("k-1"),
            OrderSide::Sell,
            Symbol::new("xrp"),
            dec!(42),
        )
        .with_condition(TriggerCondition::Oco {
            stop_price: dec!(0.30),
            take_profit_price: dec!(0.85),
        });
        let order = Order::new(command, Timestamp::now()).unwrap();

        let json = serde_json::to_value(OrderDto::from_order(&order)).unwrap();

        assert_eq!(json["status"], "pending_trigger");
        assert_eq!(json["advanced_type"], "oco");
        assert_eq!(json["condition"]["kind"], "oco");
        assert_eq!(json["asset_symbol"], "XRP");
        assert!(json["executed_price"].is_null());
    }
}
