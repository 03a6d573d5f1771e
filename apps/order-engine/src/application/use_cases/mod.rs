//! Application Use Cases
//!
//! Use cases orchestrate domain logic to fulfill application requirements.

mod cancel_order;
mod configure_limits;
mod dispatch_order;
mod evaluate_triggers;
mod query_orders;
mod submit_order;

pub use cancel_order::CancelOrderUseCase;
pub use configure_limits::{ConfigureLimitsUseCase, UpsertLimitCommand};
pub use dispatch_order::{DispatchOrderUseCase, DispatchOutcome, DispatchReport};
pub use evaluate_triggers::{EvaluateTriggersUseCase, EvaluationReport};
pub use query_orders::QueryOrdersUseCase;
pub use submit_order::SubmitOrderUseCase;
