//! Quota limit DTOs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_management::OrderSide;
use crate::domain::quota::{LimitWindow, OrderLimit};
use crate::domain::shared::Timestamp;

/// DTO representing a quota bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLimitDto {
    /// Bucket id.
    pub limit_id: String,
    /// Owning user.
    pub user_id: String,
    /// Space scope.
    pub space_id: Option<String>,
    /// Side scope.
    pub side: Option<OrderSide>,
    /// Window length.
    pub window: LimitWindow,
    /// Ceiling per window.
    pub max_amount: Decimal,
    /// Committed in the current window.
    pub used_amount: Decimal,
    /// Remaining before the ceiling (ignores in-flight holds).
    pub remaining_amount: Decimal,
    /// End of the current window.
    pub reset_at: Timestamp,
    /// Hard or soft limit.
    pub enforced: bool,
}

impl OrderLimitDto {
    /// Create from a domain bucket.
    #[must_use]
    pub fn from_limit(limit: &OrderLimit) -> Self {
        Self {
            limit_id: limit.id.to_string(),
            user_id: limit.user_id.to_string(),
            space_id: limit.space_id.as_ref().map(ToString::to_string),
            side: limit.side,
            window: limit.window,
            max_amount: limit.max_amount,
            used_amount: limit.used_amount,
            remaining_amount: limit.headroom(Decimal::ZERO).max(Decimal::ZERO),
            reset_at: limit.reset_at,
            enforced: limit.enforced,
        }
    }
}
