//! Order Management Value Objects

mod order_side;
mod order_status;
mod priority;
mod reasons;
mod trigger_condition;

pub use order_side::OrderSide;
pub use order_status::OrderStatus;
pub use priority::Priority;
pub use reasons::{FailureReason, TriggerReason};
pub use trigger_condition::{AdvancedType, TriggerCondition};
