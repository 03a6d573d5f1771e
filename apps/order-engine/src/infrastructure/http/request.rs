//! HTTP request DTOs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::use_cases::UpsertLimitCommand;
use crate::domain::order_management::{
    OrderSide, OrderStatus, Priority, SubmitOrderCommand, TriggerCondition,
};
use crate::domain::quota::LimitWindow;
use crate::domain::recurrence::{RecurrenceFrequency, RecurrenceRule};
use crate::domain::shared::{IdempotencyKey, SpaceId, Symbol, Timestamp, UserId};

/// Request to submit an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOrderRequest {
    /// Owning user.
    pub user_id: String,
    /// Shared space charged for quota.
    #[serde(default)]
    pub space_id: Option<String>,
    /// Caller-supplied de-duplication key.
    pub idempotency_key: String,
    /// Buy or sell.
    #[serde(alias = "type")]
    pub side: OrderSide,
    /// Scheduling priority.
    #[serde(default)]
    pub priority: Priority,
    /// Amount in `currency`.
    pub amount: Decimal,
    /// Quote currency.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Asset to trade.
    pub asset_symbol: String,
    /// Trigger condition; market when omitted.
    #[serde(default = "default_condition")]
    pub condition: TriggerCondition,
    /// Seed for the trailing-stop watermark.
    #[serde(default)]
    pub highest_price: Option<Decimal>,
    /// Recurrence pattern for DCA orders.
    #[serde(default)]
    pub recurrence_pattern: Option<RecurrenceFrequency>,
    /// ISO weekday (weekly) or day of month (monthly).
    #[serde(default)]
    pub recurrence_day: Option<u32>,
    /// Occurrence index of this order within its series.
    #[serde(default)]
    pub execution_count: u32,
    /// Highest occurrence index of the series.
    #[serde(default)]
    pub max_executions: Option<u32>,
    /// Explicit first schedule time.
    #[serde(default)]
    pub scheduled_for: Option<Timestamp>,
}

fn default_currency() -> String {
    "USD".to_string()
}

const fn default_condition() -> TriggerCondition {
    TriggerCondition::Market
}

impl SubmitOrderRequest {
    /// Convert into the domain command.
    #[must_use]
    pub fn into_command(self) -> SubmitOrderCommand {
        let recurrence = self.recurrence_pattern.map(|frequency| RecurrenceRule {
            frequency,
            day: self.recurrence_day,
        });

        SubmitOrderCommand {
            user_id: UserId::new(self.user_id),
            space_id: self.space_id.map(SpaceId::new),
            idempotency_key: IdempotencyKey::new(self.idempotency_key),
            side: self.side,
            priority: self.priority,
            amount: self.amount,
            currency: self.currency,
            asset_symbol: Symbol::new(self.asset_symbol),
            condition: self.condition,
            highest_price: self.highest_price,
            recurrence,
            execution_count: self.execution_count,
            max_executions: self.max_executions,
            series_key: None,
            scheduled_for: self.scheduled_for,
        }
    }
}

/// Request to cancel an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOrderRequest {
    /// Caller; must own the order.
    pub user_id: String,
}

/// Query parameters for listing orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListOrdersQuery {
    /// Owning user.
    pub user_id: String,
    /// Only orders in this status.
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

/// Request to create or replace a quota bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertLimitRequest {
    /// Owning user.
    pub user_id: String,
    /// Narrow to a space.
    #[serde(default)]
    pub space_id: Option<String>,
    /// Narrow to an order side.
    #[serde(default)]
    pub side: Option<OrderSide>,
    /// Window length.
    pub window: LimitWindow,
    /// Ceiling per window.
    pub max_amount: Decimal,
    /// Hard (deny) or soft (warn) limit.
    #[serde(default = "default_enforced")]
    pub enforced: bool,
    /// Override the committed amount in the current window.
    #[serde(default)]
    pub used_amount: Option<Decimal>,
}

const fn default_enforced() -> bool {
    true
}

impl UpsertLimitRequest {
    /// Convert into the use case command.
    #[must_use]
    pub fn into_command(self) -> UpsertLimitCommand {
        UpsertLimitCommand {
            user_id: UserId::new(self.user_id),
            space_id: self.space_id.map(SpaceId::new),
            side: self.side,
            window: self.window,
            max_amount: self.max_amount,
            enforced: self.enforced,
            used_amount: self.used_amount,
        }
    }
}

/// Query parameters for listing quota buckets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListLimitsQuery {
    /// Owning user.
    pub user_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn submit_request_defaults() {
        let json = r#"{
            "user_id": "u-1",
            "idempotency_key": "k-1",
            "type": "buy",
            "amount": "100",
            "asset_symbol": "BTC"
        }"#;

        let req: SubmitOrderRequest = serde_json::from_str(json).unwrap();
        let cmd = req.into_command();

        assert_eq!(cmd.side, OrderSide::Buy);
        assert_eq!(cmd.priority, Priority::Normal);
        assert_eq!(cmd.currency, "USD");
        assert_eq!(cmd.condition, TriggerCondition::Market);
        assert!(cmd.recurrence.is_none());
    }

    #[test]
    fn submit_request_with_condition_and_recurrence() {
        let json = r#"{
            "user_id": "u-1",
            "idempotency_key": "dca",
            "side": "buy",
            "amount": "50",
            "asset_symbol": "ETH",
            "recurrence_pattern": "weekly",
            "recurrence_day": 1,
            "max_executions": 52
        }"#;

        let cmd = serde_json::from_str::<SubmitOrderRequest>(json)
            .unwrap()
            .into_command();

        assert_eq!(cmd.recurrence, Some(RecurrenceRule::weekly(1)));
        assert_eq!(cmd.max_executions, Some(52));
        assert_eq!(cmd.amount, dec!(50));
    }

    #[test]
    fn limit_request_defaults_to_enforced() {
        let json = r#"{"user_id": "u-1", "window": "daily", "max_amount": "5000"}"#;

        let cmd = serde_json::from_str::<UpsertLimitRequest>(json)
            .unwrap()
            .into_command();

        assert!(cmd.enforced);
        assert_eq!(cmd.side, None);
        assert_eq!(cmd.window, LimitWindow::Daily);
    }
}
