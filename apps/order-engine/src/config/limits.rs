//! Quota buckets seeded at startup.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_management::OrderSide;
use crate::domain::quota::{LimitSettings, LimitWindow};
use crate::domain::shared::{SpaceId, UserId};

/// One quota bucket declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitSeed {
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
}

impl LimitSeed {
    /// Settings for this seed's bucket, starting with no usage.
    #[must_use]
    pub fn to_settings(&self) -> LimitSettings {
        LimitSettings {
            user_id: UserId::new(self.user_id.clone()),
            space_id: self.space_id.clone().map(SpaceId::new),
            side: self.side,
            window: self.window,
            max_amount: self.max_amount,
            enforced: self.enforced,
            used_amount: None,
        }
    }
}

const fn default_enforced() -> bool {
    true
}
